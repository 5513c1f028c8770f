//! Incremental ELT cycle
//!
//! One run is three ordered steps sharing a run id:
//!
//! 1. **extract**: resolve the resume point and discover new comics
//! 2. **load**: normalize them and append to staging
//! 3. **transform**: rebuild the warehouse from the full staging table
//!
//! Extracted records travel from extract to load through [`RunHandoff`], keyed
//! by the run id. Transform never looks at the hand-off; it re-reads staging.

use comics_common::Table;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_CHUNK_SIZE, DEFAULT_SKIP_ID};
use crate::error::EltResult;
use crate::extract::{resolve_resume_point, Discovery};
use crate::normalize::normalize;
use crate::source::{ComicSource, RawRecord};
use crate::staging::{StagingReport, StagingWriter};
use crate::store::{StagingStore, WarehouseStore};
use crate::transform::{TransformReport, Transformer};

/// In-memory hand-off of extracted records between steps of the same run
#[derive(Debug, Default)]
pub struct RunHandoff {
    batches: Mutex<HashMap<Uuid, Vec<RawRecord>>>,
}

impl RunHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, run_id: Uuid, records: Vec<RawRecord>) {
        match self.batches.lock() {
            Ok(mut batches) => {
                batches.insert(run_id, records);
            },
            Err(_) => {
                warn!(%run_id, dropped = records.len(), "Hand-off lock poisoned, records dropped");
            },
        }
    }

    /// Remove and return the records handed off by `run_id`
    pub fn take(&self, run_id: Uuid) -> Option<Vec<RawRecord>> {
        self.batches.lock().ok().and_then(|mut b| b.remove(&run_id))
    }

    /// Number of runs with records waiting
    pub fn pending(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

/// Summary of one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub fetched: usize,
    pub staging: StagingReport,
    pub transform: TransformReport,
}

pub struct EltPipeline {
    source: Arc<dyn ComicSource>,
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn WarehouseStore>,
    handoff: RunHandoff,
    skip_id: i64,
    chunk_size: usize,
}

impl EltPipeline {
    pub fn new(
        source: Arc<dyn ComicSource>,
        staging: Arc<dyn StagingStore>,
        warehouse: Arc<dyn WarehouseStore>,
    ) -> Self {
        Self {
            source,
            staging,
            warehouse,
            handoff: RunHandoff::new(),
            skip_id: DEFAULT_SKIP_ID,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_skip_id(mut self, skip_id: i64) -> Self {
        self.skip_id = skip_id;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Discover comics past the resume point and hand them off to `run_id`.
    ///
    /// Never fails; a source error ends discovery early with what was found.
    pub async fn extract_step(&self, run_id: Uuid) -> usize {
        let start = resolve_resume_point(self.staging.as_ref()).await;
        let records = Discovery::new(self.source.as_ref(), start, self.skip_id)
            .collect_all()
            .await;

        let fetched = records.len();
        info!(%run_id, start, fetched, "Extract step finished");
        self.handoff.put(run_id, records);
        fetched
    }

    /// Normalize the records handed off by `run_id` and append them to staging.
    pub async fn load_step(&self, run_id: Uuid) -> EltResult<StagingReport> {
        let records = self.handoff.take(run_id).unwrap_or_else(|| {
            warn!(%run_id, "No records handed off for run");
            Vec::new()
        });

        let batch = if records.is_empty() {
            Table::default()
        } else {
            normalize(&records)?
        };

        Ok(StagingWriter::new(self.staging.as_ref(), self.chunk_size)
            .write(&batch)
            .await)
    }

    /// Rebuild the warehouse tables from the full staging table.
    pub async fn transform_step(&self) -> EltResult<TransformReport> {
        let report = Transformer::new(self.staging.as_ref(), self.warehouse.as_ref())
            .run()
            .await?;
        Ok(report)
    }

    /// Run extract, load and transform once, in that order.
    pub async fn run_once(&self) -> EltResult<RunReport> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting ELT run");

        let fetched = self.extract_step(run_id).await;
        let staging = self.load_step(run_id).await?;
        let transform = self.transform_step().await?;

        info!(
            %run_id,
            fetched,
            staged = staging.rows_written,
            dimension = ?transform.dimension,
            fact = ?transform.fact,
            "ELT run complete"
        );

        Ok(RunReport {
            run_id,
            fetched,
            staging,
            transform,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::{FetchOutcome, SourceResult};
    use crate::store::MemoryStore;
    use crate::transform::TableWrite;
    use async_trait::async_trait;
    use serde_json::json;

    /// Comics `1..=last`
    struct Range {
        last: i64,
    }

    #[async_trait]
    impl ComicSource for Range {
        async fn fetch(&self, num: i64) -> SourceResult<FetchOutcome> {
            if num > self.last {
                return Ok(FetchOutcome::NotFound { status: 404 });
            }
            let body = json!({
                "num": num, "title": "Test", "month": "4", "year": "2007",
                "transcript": "", "img": "i", "alt": "a"
            });
            Ok(FetchOutcome::Found(RawRecord::from_json(num, body).unwrap()))
        }
    }

    fn pipeline(last: i64, store: Arc<MemoryStore>) -> EltPipeline {
        EltPipeline::new(Arc::new(Range { last }), store.clone(), store)
    }

    #[test]
    fn test_handoff_take_removes_batch() {
        let handoff = RunHandoff::new();
        let run_id = Uuid::new_v4();

        handoff.put(run_id, Vec::new());
        assert_eq!(handoff.pending(), 1);
        assert!(handoff.take(run_id).is_some());
        assert!(handoff.take(run_id).is_none());
        assert_eq!(handoff.pending(), 0);
    }

    #[test]
    fn test_handoff_put_survives_poisoned_lock() {
        let handoff = RunHandoff::new();
        let run_id = Uuid::new_v4();

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = handoff.batches.lock().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(poisoned.is_err());
        assert!(handoff.batches.is_poisoned());

        handoff.put(run_id, Vec::new());
        assert!(handoff.take(run_id).is_none());
    }

    #[tokio::test]
    async fn test_steps_share_run_id() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(2, store.clone());
        let run_id = Uuid::new_v4();

        assert_eq!(pipeline.extract_step(run_id).await, 2);
        let staging = pipeline.load_step(run_id).await.unwrap();

        assert_eq!(staging.rows_written, 2);
        assert_eq!(pipeline.handoff.pending(), 0);
        assert_eq!(store.staging().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_only_fetches_new_comics() {
        let store = Arc::new(MemoryStore::new());

        let first = pipeline(2, store.clone()).run_once().await.unwrap();
        let second = pipeline(3, store.clone()).run_once().await.unwrap();

        assert_eq!(first.fetched, 2);
        assert_eq!(second.fetched, 1);
        assert_eq!(store.staging().unwrap().len(), 3);
        assert_eq!(second.transform.fact, TableWrite::Written(3));
    }

    #[tokio::test]
    async fn test_empty_extraction_still_transforms() {
        let store = Arc::new(MemoryStore::new());
        pipeline(1, store.clone()).run_once().await.unwrap();

        let report = pipeline(1, store.clone()).run_once().await.unwrap();

        assert_eq!(report.fetched, 0);
        assert_eq!(report.staging, StagingReport::default());
        assert_eq!(report.transform.dimension, TableWrite::Written(1));
    }
}
