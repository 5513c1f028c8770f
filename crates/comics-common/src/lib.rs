//! Comics Common Library
//!
//! Shared building blocks for the comics ELT workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`ComicsError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Tables**: the primitive-only tabular model ([`Cell`], [`Table`]) that
//!   every store reads and writes
//!
//! # Example
//!
//! ```no_run
//! use comics_common::{Cell, Table};
//!
//! fn build() -> comics_common::Result<Table> {
//!     let mut table = Table::new(vec!["num".to_string(), "title".to_string()]);
//!     table.push_row(vec![Cell::Int(1), Cell::Text("Barrel - Part 1".to_string())])?;
//!     Ok(table)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod table;

// Re-export commonly used types
pub use error::{ComicsError, Result};
pub use table::{Cell, Table};
