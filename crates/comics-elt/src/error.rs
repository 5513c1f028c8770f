//! Pipeline-level error type

use thiserror::Error;

use crate::db::DbError;
use crate::export::ExportError;
use crate::source::SourceError;
use crate::transform::TransformError;

/// Errors that end a pipeline step or a one-shot command
#[derive(Error, Debug)]
pub enum EltError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Normalization failed: {0}")]
    Normalize(#[from] comics_common::ComicsError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Backfill discovered nothing; staging and the export were left as they were
    #[error("Backfill fetched no comics, staging left untouched")]
    NothingFetched,
}

pub type EltResult<T> = Result<T, EltError>;
