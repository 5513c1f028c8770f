//! Resume-point resolution

use tracing::{error, info};

use crate::store::StagingStore;

/// Identifier of the first comic the source ever published
pub const FIRST_COMIC: i64 = 1;

/// Next comic number to fetch: one past the highest staged `num`.
///
/// An empty staging table, a missing table or any query failure all resolve
/// to [`FIRST_COMIC`]. Failures are logged, never returned.
pub async fn resolve_resume_point(store: &dyn StagingStore) -> i64 {
    match store.max_num().await {
        Ok(Some(latest)) => {
            let start = latest + 1;
            info!(latest, start, "Resuming extraction after latest staged comic");
            start
        },
        Ok(None) => {
            info!(start = FIRST_COMIC, "Staging table is empty, starting from the first comic");
            FIRST_COMIC
        },
        Err(e) => {
            error!(error = %e, "Error fetching latest comic id from staging, starting from the first comic");
            FIRST_COMIC
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use comics_common::{Cell, Table};

    fn staged(nums: &[i64]) -> Table {
        let mut table = Table::new(vec!["num".to_string(), "title".to_string()]);
        for n in nums {
            table.push_row(vec![Cell::Int(*n), Cell::Text(format!("Comic {}", n))]).unwrap();
        }
        table
    }

    #[tokio::test]
    async fn test_empty_staging_resumes_at_one() {
        let store = MemoryStore::with_staging(staged(&[]));
        assert_eq!(resolve_resume_point(&store).await, 1);
    }

    #[tokio::test]
    async fn test_resumes_after_highest_num() {
        let store = MemoryStore::with_staging(staged(&[1, 2, 5]));
        assert_eq!(resolve_resume_point(&store).await, 6);
    }

    #[tokio::test]
    async fn test_missing_table_resumes_at_one() {
        let store = MemoryStore::new();
        assert_eq!(resolve_resume_point(&store).await, 1);
    }
}
