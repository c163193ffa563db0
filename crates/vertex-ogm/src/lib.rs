//! Typed records mapped onto property graph vertices
//!
//! Records are declared with [`vertex_record!`] and persisted through any
//! [`GraphSource`]. Every write is an idempotent merge keyed on the vertex id,
//! and every write reloads the record from what the database reports.

pub mod adapters;
pub mod config;
pub mod data;
pub mod services;
pub mod traits;

mod macros;

// Fixtures shared by unit and integration tests
pub mod test_utils;

pub use config::BatchConfig;
pub use data::errors::{GraphSourceError, OgmError, OgmResult};
pub use data::identifiers::{normalize, Identity, Token, VertexId};
pub use data::trace_context::TraceContext;
pub use data::types::{ElementMap, FieldValue, PropertyMap, PropertyValue};
pub use traits::{DumpOptions, FieldMap, GraphSource, MergeV, Record, Step, Traversal};
pub use services::{sanitize, BatchReport, Vertex, VertexSet};
pub use adapters::InMemoryGraph;
#[cfg(feature = "neo4j")]
pub use adapters::{Neo4jConfig, Neo4jGraph};

/// Initializes a global tracing subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
