//! Core data structures for vertex mapping

pub mod errors;
pub mod identifiers;
pub mod trace_context;
pub mod types;

pub use errors::{GraphSourceError, OgmError, OgmResult};
pub use identifiers::{normalize, Identity, Token, VertexId};
pub use trace_context::TraceContext;
pub use types::{ElementMap, FieldValue, PropertyMap, PropertyValue};
