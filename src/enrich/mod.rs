//! Response enrichment pipeline.
//!
//! # Data Flow
//! ```text
//! raw body bytes
//!     → transform.rs (classify: collection / single / not applicable)
//!     → object.rs (per object: kind → registry.rs → printers → columns.rs)
//!     → re-serialized body, or an error telling the caller to keep the original
//! ```
//!
//! # Design Decisions
//! - Documents stay generic (`serde_json::Value`); typed conversion happens
//!   only inside the registered generator
//! - The registry is built once and read concurrently without locks
//! - Every error is local to one response; callers fail open

pub mod columns;
pub mod error;
pub mod object;
pub mod registry;
pub mod transform;

pub use columns::{format_column, join_conditions, DISPLAY_FIELD};
pub use error::{EnrichError, TransformError};
pub use object::enrich_object;
pub use registry::{EnrichmentRegistry, TableFn};
pub use transform::transform_body;
