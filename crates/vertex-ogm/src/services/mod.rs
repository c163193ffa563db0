//! Merge protocols built on top of a GraphSource

pub mod sanitize;
pub mod vertex;
pub mod vertices;

pub use sanitize::sanitize;
pub use vertex::Vertex;
pub use vertices::{BatchReport, VertexSet};
