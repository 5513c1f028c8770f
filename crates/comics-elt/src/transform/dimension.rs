//! `dim_comic` derivation

use comics_common::{Cell, Table};
use serde::Serialize;

use super::TransformError;

/// Descriptive attributes of one comic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionRow {
    pub comic_id: i64,
    pub title: String,
    pub publication_month: i32,
    pub publication_year: i32,
    pub transcript: String,
    pub img_url: String,
    pub alt_text: String,
}

/// Staging columns the dimension reads, by position
struct SourceColumns {
    num: usize,
    title: usize,
    month: usize,
    year: usize,
    transcript: usize,
    img: usize,
    alt: usize,
}

impl SourceColumns {
    fn locate(staging: &Table) -> Result<Self, TransformError> {
        let find = |name: &str| {
            staging
                .column_index(name)
                .ok_or_else(|| TransformError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            num: find("num")?,
            title: find("title")?,
            month: find("month")?,
            year: find("year")?,
            transcript: find("transcript")?,
            img: find("img")?,
            alt: find("alt")?,
        })
    }
}

/// Project every staged row onto the dimension schema.
///
/// `month` and `year` must be integers or integer text; the first value that
/// is not aborts the whole derivation.
pub fn derive_dimension(staging: &Table) -> Result<Vec<DimensionRow>, TransformError> {
    let cols = SourceColumns::locate(staging)?;

    staging
        .rows()
        .iter()
        .map(|row| -> Result<DimensionRow, TransformError> {
            let comic_id = row[cols.num]
                .as_i64()
                .ok_or_else(|| TransformError::cast("num", &row[cols.num], &row[cols.num]))?;

            Ok(DimensionRow {
                comic_id,
                title: text(&row[cols.title]),
                publication_month: to_i32("month", &row[cols.month], &row[cols.num])?,
                publication_year: to_i32("year", &row[cols.year], &row[cols.num])?,
                transcript: text(&row[cols.transcript]),
                img_url: text(&row[cols.img]),
                alt_text: text(&row[cols.alt]),
            })
        })
        .collect()
}

fn text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_i32(column: &str, cell: &Cell, comic: &Cell) -> Result<i32, TransformError> {
    cell.as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| TransformError::cast(column, cell, comic))
}
