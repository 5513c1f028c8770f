//! Comics ELT Library
//!
//! Incremental extract-load-transform pipeline for xkcd comic metadata.
//!
//! # Flow
//!
//! - **Extract**: resolve where the last run stopped ([`extract::resolve_resume_point`])
//!   and walk the source one comic at a time ([`extract::Discovery`])
//! - **Load**: flatten records into primitive cells ([`normalize`]) and append
//!   them to the staging table ([`staging::StagingWriter`])
//! - **Transform**: rebuild the `dim_comic` and `fact_comic_performance`
//!   tables from the whole staging table ([`transform::Transformer`])
//!
//! [`pipeline::EltPipeline`] chains the three steps; [`scheduler::Scheduler`]
//! fires them on a cron schedule. [`historical::backfill`] is the one-shot
//! full rebuild with CSV export.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use comics_elt::{config::Config, db, pipeline::EltPipeline, source::XkcdClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = Arc::new(db::PgStore::new(db::create_pool(&config.database).await?));
//!     let source = Arc::new(XkcdClient::from_config(&config.source)?);
//!
//!     let report = EltPipeline::new(source, store.clone(), store).run_once().await?;
//!     println!("fetched {} comics", report.fetched);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod historical;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod staging;
pub mod store;
pub mod transform;

pub use error::{EltError, EltResult};
