//! Collaborator traits: the graph database boundary and the record schema

pub mod graph_source;
pub mod record;

pub use graph_source::{GraphSource, MergeV, Step, Traversal};
pub use record::{DumpOptions, FieldMap, Record};
