//! Staging to warehouse transformation
//!
//! Reads the whole staging table, derives the dimension and fact tables and
//! replaces both in the warehouse. Nothing is incremental: each run rebuilds
//! the two tables from everything staged so far.
//!
//! A staging read failure or an uncastable `month`/`year` aborts the run
//! before anything is written. The two table writes are independent; a failed
//! dimension write is logged and the fact write is still attempted.

use comics_common::{Cell, Table};
use rand::Rng;
use thiserror::Error;
use tracing::{error, info};

use crate::db::{DbError, DIMENSION_TABLE, FACT_TABLE, STAGING_TABLE};
use crate::store::{StagingStore, WarehouseStore};

mod dimension;
mod fact;

pub use dimension::{derive_dimension, DimensionRow};
pub use fact::{cost, customer_reviews, derive_fact, views, FactRow};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Error reading staging table: {0}")]
    Read(#[source] DbError),

    #[error("Staging table has no '{0}' column")]
    MissingColumn(String),

    #[error("Cannot cast {column} value '{value}' to an integer (comic {comic})")]
    Cast {
        column: String,
        comic: String,
        value: String,
    },
}

impl TransformError {
    pub(crate) fn cast(column: &str, value: &Cell, comic: &Cell) -> Self {
        Self::Cast {
            column: column.to_string(),
            comic: comic.to_string(),
            value: value.to_string(),
        }
    }
}

/// Outcome of writing one warehouse table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableWrite {
    Written(u64),
    Failed(String),
}

impl TableWrite {
    pub fn is_written(&self) -> bool {
        matches!(self, TableWrite::Written(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub staged_rows: usize,
    pub dimension: TableWrite,
    pub fact: TableWrite,
}

impl TransformReport {
    pub fn is_complete(&self) -> bool {
        self.dimension.is_written() && self.fact.is_written()
    }
}

/// Derive both warehouse tables from a staging snapshot.
///
/// Pure apart from `rng`; a seeded generator gives reproducible facts.
pub fn derive_tables<R: Rng>(
    staging: &Table,
    rng: &mut R,
) -> Result<(Vec<DimensionRow>, Vec<FactRow>), TransformError> {
    let dimension = derive_dimension(staging)?;
    let fact = derive_fact(&dimension, rng);
    Ok((dimension, fact))
}

pub struct Transformer<'a> {
    staging: &'a dyn StagingStore,
    warehouse: &'a dyn WarehouseStore,
}

impl<'a> Transformer<'a> {
    pub fn new(staging: &'a dyn StagingStore, warehouse: &'a dyn WarehouseStore) -> Self {
        Self { staging, warehouse }
    }

    /// Rebuild the warehouse using the thread-local generator.
    pub async fn run(&self) -> Result<TransformReport, TransformError> {
        let snapshot = self.read_staging().await?;
        let (dimension, fact) = derive_tables(&snapshot, &mut rand::rng())?;
        Ok(self.write(snapshot.len(), &dimension, &fact).await)
    }

    /// Rebuild the warehouse drawing simulated measures from `rng`.
    pub async fn run_with_rng<R: Rng + Send>(
        &self,
        rng: &mut R,
    ) -> Result<TransformReport, TransformError> {
        let snapshot = self.read_staging().await?;
        let (dimension, fact) = derive_tables(&snapshot, rng)?;
        Ok(self.write(snapshot.len(), &dimension, &fact).await)
    }

    async fn read_staging(&self) -> Result<Table, TransformError> {
        let snapshot = self.staging.read_all().await.map_err(|e| {
            error!(table = STAGING_TABLE, error = %e, "Error reading staging table");
            TransformError::Read(e)
        })?;
        info!(table = STAGING_TABLE, rows = snapshot.len(), "Read staging table");
        Ok(snapshot)
    }

    async fn write(
        &self,
        staged_rows: usize,
        dimension: &[DimensionRow],
        fact: &[FactRow],
    ) -> TransformReport {
        let dimension = record(
            DIMENSION_TABLE,
            self.warehouse.replace_dimension(dimension).await,
        );
        let fact = record(FACT_TABLE, self.warehouse.replace_fact(fact).await);

        TransformReport {
            staged_rows,
            dimension,
            fact,
        }
    }
}

fn record(table: &str, result: Result<u64, DbError>) -> TableWrite {
    match result {
        Ok(rows) => {
            info!(table, rows, "Replaced warehouse table");
            TableWrite::Written(rows)
        },
        Err(e) => {
            error!(table, error = %e, "Error writing warehouse table");
            TableWrite::Failed(e.to_string())
        },
    }
}
