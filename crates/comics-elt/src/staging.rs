//! Staging writer
//!
//! Appends normalized batches to the staging table in fixed-size chunks.
//! Each chunk is its own write: a failing chunk stops the load, but chunks
//! already written stay in place.

use comics_common::Table;
use tracing::{error, info};

use crate::db::STAGING_TABLE;
use crate::store::StagingStore;

/// What a load attempt achieved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub rows_written: u64,
    pub chunks_written: usize,
    pub chunks_total: usize,
    /// First write error, if the load stopped early
    pub error: Option<String>,
}

impl StagingReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

pub struct StagingWriter<'a> {
    store: &'a dyn StagingStore,
    chunk_size: usize,
}

impl<'a> StagingWriter<'a> {
    pub fn new(store: &'a dyn StagingStore, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Append `batch`; an empty batch writes nothing.
    ///
    /// Never fails: write errors are logged and reported in the result.
    pub async fn write(&self, batch: &Table) -> StagingReport {
        let mut report = StagingReport::default();

        if batch.is_empty() {
            info!(table = STAGING_TABLE, "No comics to load");
            return report;
        }

        report.chunks_total = batch.len().div_ceil(self.chunk_size);

        for (idx, chunk) in batch.chunks(self.chunk_size).enumerate() {
            match self.store.append(&chunk).await {
                Ok(rows) => {
                    report.rows_written += rows;
                    report.chunks_written += 1;
                },
                Err(e) => {
                    error!(
                        table = STAGING_TABLE,
                        chunk = idx + 1,
                        chunks = report.chunks_total,
                        rows_written = report.rows_written,
                        error = %e,
                        "Error during load, earlier chunks stay committed"
                    );
                    report.error = Some(e.to_string());
                    return report;
                },
            }
        }

        info!(
            table = STAGING_TABLE,
            rows = report.rows_written,
            chunks = report.chunks_written,
            "Loaded new comics into staging"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::{DbError, DbResult};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use comics_common::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn batch(count: i64) -> Table {
        let mut table = Table::new(vec!["num".to_string()]);
        for n in 1..=count {
            table.push_row(vec![Cell::Int(n)]).unwrap();
        }
        table
    }

    /// Accepts `ok_chunks` appends, then fails every later one
    struct FlakyStore {
        inner: MemoryStore,
        ok_chunks: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StagingStore for FlakyStore {
        async fn max_num(&self) -> DbResult<Option<i64>> {
            self.inner.max_num().await
        }

        async fn append(&self, batch: &Table) -> DbResult<u64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_chunks {
                return Err(DbError::Unavailable("connection dropped".to_string()));
            }
            self.inner.append(batch).await
        }

        async fn replace(&self, batch: &Table) -> DbResult<u64> {
            self.inner.replace(batch).await
        }

        async fn read_all(&self) -> DbResult<Table> {
            self.inner.read_all().await
        }
    }

    #[tokio::test]
    async fn test_writes_in_chunks() {
        let store = MemoryStore::new();
        let report = StagingWriter::new(&store, 2).write(&batch(5)).await;

        assert_eq!(report.rows_written, 5);
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_written, 3);
        assert!(report.is_complete());
        assert_eq!(store.read_all().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        let report = StagingWriter::new(&store, 1000).write(&batch(0)).await;

        assert_eq!(report, StagingReport::default());
        assert!(store.staging().is_none());
    }

    #[tokio::test]
    async fn test_failed_chunk_keeps_earlier_chunks() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            ok_chunks: 1,
            calls: AtomicUsize::new(0),
        };
        let report = StagingWriter::new(&store, 2).write(&batch(5)).await;

        assert_eq!(report.rows_written, 2);
        assert_eq!(report.chunks_written, 1);
        assert!(!report.is_complete());
        assert_eq!(store.inner.read_all().await.unwrap().len(), 2);
    }
}
