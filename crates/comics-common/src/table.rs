//! Primitive-only tabular model
//!
//! Every value that crosses a store boundary is a [`Cell`]; nested source
//! values are serialized to text before they reach a [`Table`].

use crate::error::{ComicsError, Result};
use std::fmt;

/// A single primitive table value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Borrow the text payload, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the cell: integers, integral floats and numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    /// Flat text rendering used for CSV export and text coercion (null renders empty)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

/// Column-ordered rows of [`Cell`]s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ComicsError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| ComicsError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replace every null cell with `fill`, returning how many were replaced.
    pub fn fill_missing(&mut self, fill: &Cell) -> usize {
        let mut filled = 0;
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_null() {
                *cell = fill.clone();
                filled += 1;
            }
        }
        filled
    }

    /// Append all rows of `other`, widening this table to the union of both
    /// column sets. Cells missing on either side become [`Cell::Null`].
    pub fn extend_union(&mut self, other: Table) {
        for column in &other.columns {
            if self.column_index(column).is_none() {
                self.columns.push(column.clone());
                for row in &mut self.rows {
                    row.push(Cell::Null);
                }
            }
        }

        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();

        for row in other.rows {
            let mut widened = vec![Cell::Null; self.columns.len()];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                widened[target] = cell;
            }
            self.rows.push(widened);
        }
    }

    /// Split into owned sub-tables of at most `size` rows (size 0 is treated as 1).
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = Table> + '_ {
        self.rows.chunks(size.max(1)).map(|rows| Table {
            columns: self.columns.clone(),
            rows: rows.to_vec(),
        })
    }
}
