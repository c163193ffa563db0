//! Trace context carried through every graph round trip

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates the round trips issued on behalf of one record operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_id: Option<String>,
    /// Operation that opened the trace, e.g. `"save"` or `"batch_create"`.
    pub operation: String,
}

impl TraceContext {
    /// Opens a new trace for a top-level record operation.
    pub fn for_operation(operation: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            parent_id: None,
            operation: operation.into(),
        }
    }

    /// Creates a child context for one round trip, inheriting the trace_id.
    pub fn new_child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            parent_id: Some(self.span_id.clone()),
            operation: self.operation.clone(),
        }
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::for_operation("adhoc")
    }
}
