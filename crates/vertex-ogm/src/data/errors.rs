//! Error types for vertex mapping

use thiserror::Error;

/// Result alias used throughout the crate.
pub type OgmResult<T> = Result<T, OgmError>;

/// Base error type for record/vertex synchronization.
///
/// "Not found" is never an error here: lookups and failed merges report absence
/// through `Option`/`bool` return values instead.
#[derive(Error, Debug)]
pub enum OgmError {
    #[error("Malformed property map: {0}")]
    MalformedPropertyMap(String),

    #[error("Record of label '{label}' has no identity")]
    MissingIdentity { label: &'static str },

    #[error("Unknown field '{field}' for label '{label}'")]
    UnknownField { label: &'static str, field: String },

    #[error("Field '{field}' expected {expected}, got {found}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Batch {operation} left {} of {submitted} vertices unreconciled", .missing.len())]
    PartialBatch {
        operation: &'static str,
        submitted: usize,
        missing: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Graph source error: {0}")]
    GraphSource(#[from] GraphSourceError),
}

impl OgmError {
    /// Helper to create a field type error
    pub fn field_type(
        field: impl Into<String>,
        expected: &'static str,
        found: impl std::fmt::Debug,
    ) -> Self {
        OgmError::FieldType {
            field: field.into(),
            expected,
            found: format!("{:?}", found),
        }
    }
}

/// Errors raised at the graph database driver boundary.
#[derive(Error, Debug)]
pub enum GraphSourceError {
    #[error("Graph database connection error: {0}")]
    ConnectionError(String),
    #[error("Graph query execution error: {0}")]
    QueryError(String),
    #[error("Data mapping error from graph result: {0}")]
    MappingError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown database error: {0}")]
    Unknown(String),
}

impl From<String> for GraphSourceError {
    fn from(error: String) -> Self {
        GraphSourceError::Unknown(error)
    }
}
