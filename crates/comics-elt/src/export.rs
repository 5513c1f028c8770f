//! CSV export of a staging snapshot

use comics_common::Table;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create export file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `table` as CSV: a header row, then one line per row.
///
/// Nulls are written as empty fields. Returns the number of data rows.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<usize, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.columns())?;

    for row in table.rows() {
        csv.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    csv.flush()?;
    Ok(table.len())
}

/// Export `table` to a CSV file at `path`, replacing any existing file.
pub fn export_csv(table: &Table, path: &Path) -> Result<usize, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = write_csv(table, file)?;
    info!(path = %path.display(), rows, "Exported comics to CSV");
    Ok(rows)
}
