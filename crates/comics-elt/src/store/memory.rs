//! In-process store used by tests and dry runs

use async_trait::async_trait;
use comics_common::Table;
use std::sync::{Mutex, MutexGuard};

use super::{StagingStore, WarehouseStore};
use crate::db::{DbError, DbResult, DIMENSION_TABLE, FACT_TABLE, STAGING_TABLE};
use crate::transform::{DimensionRow, FactRow};

#[derive(Debug, Default)]
struct Tables {
    staging: Option<Table>,
    dimension: Option<Vec<DimensionRow>>,
    fact: Option<Vec<FactRow>>,
}

/// Store keeping all three tables in memory.
///
/// Tables start out missing, like a fresh database: reading the staging table
/// before anything was written is an error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose staging table already holds `staging`
    pub fn with_staging(staging: Table) -> Self {
        Self {
            tables: Mutex::new(Tables {
                staging: Some(staging),
                ..Tables::default()
            }),
        }
    }

    pub fn staging(&self) -> Option<Table> {
        self.lock().ok().and_then(|t| t.staging.clone())
    }

    pub fn dimension(&self) -> Option<Vec<DimensionRow>> {
        self.lock().ok().and_then(|t| t.dimension.clone())
    }

    pub fn fact(&self) -> Option<Vec<FactRow>> {
        self.lock().ok().and_then(|t| t.fact.clone())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| DbError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl StagingStore for MemoryStore {
    async fn max_num(&self) -> DbResult<Option<i64>> {
        let tables = self.lock()?;
        let staging = tables
            .staging
            .as_ref()
            .ok_or_else(|| DbError::missing_table(STAGING_TABLE))?;

        Ok(staging
            .column("num")?
            .into_iter()
            .filter_map(|cell| cell.as_i64())
            .max())
    }

    async fn append(&self, batch: &Table) -> DbResult<u64> {
        let mut tables = self.lock()?;
        match tables.staging.as_mut() {
            Some(staging) => staging.extend_union(batch.clone()),
            None => tables.staging = Some(batch.clone()),
        }
        Ok(batch.len() as u64)
    }

    async fn replace(&self, batch: &Table) -> DbResult<u64> {
        self.lock()?.staging = Some(batch.clone());
        Ok(batch.len() as u64)
    }

    async fn read_all(&self) -> DbResult<Table> {
        self.lock()?
            .staging
            .clone()
            .ok_or_else(|| DbError::missing_table(STAGING_TABLE))
    }
}

#[async_trait]
impl WarehouseStore for MemoryStore {
    async fn replace_dimension(&self, rows: &[DimensionRow]) -> DbResult<u64> {
        tracing::debug!(table = DIMENSION_TABLE, rows = rows.len(), "Replacing table in memory");
        self.lock()?.dimension = Some(rows.to_vec());
        Ok(rows.len() as u64)
    }

    async fn replace_fact(&self, rows: &[FactRow]) -> DbResult<u64> {
        tracing::debug!(table = FACT_TABLE, rows = rows.len(), "Replacing table in memory");
        self.lock()?.fact = Some(rows.to_vec());
        Ok(rows.len() as u64)
    }
}
