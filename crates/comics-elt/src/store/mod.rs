//! Store contracts
//!
//! Components never hold a database handle of their own; they receive a
//! store implementing these traits. [`crate::db::PgStore`] is the production
//! implementation, [`MemoryStore`] backs tests and dry runs.

use async_trait::async_trait;
use comics_common::Table;

use crate::db::DbResult;
use crate::transform::{DimensionRow, FactRow};

mod memory;

pub use memory::MemoryStore;

/// The append-only staging table
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Highest `num` currently staged; `None` when the table holds no rows.
    async fn max_num(&self) -> DbResult<Option<i64>>;

    /// Append `batch` as new rows, returning the number of rows written.
    ///
    /// Existing rows are never touched. Columns the table has not seen yet are
    /// added so the staged schema stays the union of all batches.
    async fn append(&self, batch: &Table) -> DbResult<u64>;

    /// Drop the staging table and recreate it holding exactly `batch`.
    async fn replace(&self, batch: &Table) -> DbResult<u64>;

    /// Read every staged row.
    async fn read_all(&self) -> DbResult<Table>;
}

/// The derived dimension and fact tables
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Replace the whole dimension table with `rows`.
    async fn replace_dimension(&self, rows: &[DimensionRow]) -> DbResult<u64>;

    /// Replace the whole fact table with `rows`.
    async fn replace_fact(&self, rows: &[FactRow]) -> DbResult<u64>;
}
