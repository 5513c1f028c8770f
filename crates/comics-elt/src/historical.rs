//! Historical bulk load
//!
//! One-shot rebuild of the staging table from the very first comic, followed
//! by a CSV export of the same snapshot. Unlike the incremental cycle, missing
//! values are filled with empty strings and the staging table is replaced, not
//! appended to.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{EltError, EltResult};
use crate::export::export_csv;
use crate::extract::{Discovery, FIRST_COMIC};
use crate::normalize::normalize_filled;
use crate::source::ComicSource;
use crate::store::StagingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub fetched: usize,
    pub staged: u64,
    pub exported: usize,
    pub path: PathBuf,
}

/// Fetch every comic, replace staging with them and export to `output`.
///
/// If discovery finds nothing (the source is down or comic 1 is unusable)
/// nothing is written and [`EltError::NothingFetched`] is returned.
pub async fn backfill(
    source: &dyn ComicSource,
    store: &dyn StagingStore,
    skip_id: i64,
    output: &Path,
) -> EltResult<BackfillReport> {
    info!(start = FIRST_COMIC, "Starting historical backfill");

    let records = Discovery::new(source, FIRST_COMIC, skip_id).collect_all().await;
    if records.is_empty() {
        warn!("Backfill fetched no comics, keeping existing staging table");
        return Err(EltError::NothingFetched);
    }

    let table = normalize_filled(&records)?;

    let staged = store.replace(&table).await?;
    let exported = export_csv(&table, output)?;

    let report = BackfillReport {
        fetched: records.len(),
        staged,
        exported,
        path: output.to_path_buf(),
    };
    info!(
        fetched = report.fetched,
        staged = report.staged,
        path = %output.display(),
        "Historical backfill complete"
    );
    Ok(report)
}
