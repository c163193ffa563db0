//! GraphSource implementations

pub mod memory;
#[cfg(feature = "neo4j")]
pub mod neo4j_store;

pub use memory::InMemoryGraph;
#[cfg(feature = "neo4j")]
pub use neo4j_store::{Neo4jConfig, Neo4jGraph};
