//! Incremental extraction
//!
//! - **resume**: where the previous runs stopped
//! - **discovery**: walk the source from that point until it runs dry

pub mod discovery;
pub mod resume;

pub use discovery::{next_id, Discovery, DiscoveryState};
pub use resume::{resolve_resume_point, FIRST_COMIC};
