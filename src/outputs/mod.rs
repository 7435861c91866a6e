//! Presentation of an [`AggregationBatch`](crate::models::AggregationBatch).
//!
//! # Submodules
//!
//! - [`terminal`]: Plain text layout, one block per article
//! - [`json`]: The batch as a JSON array for other programs
//!
//! Neither writes files; both render to any `io::Write`, normally stdout.

pub mod json;
pub mod terminal;
