//! GraphSource trait definition for graph database interaction

use async_trait::async_trait;

use crate::data::{
    errors::GraphSourceError,
    identifiers::VertexId,
    trace_context::TraceContext,
    types::{ElementMap, PropertyMap, PropertyValue},
};

/// An idempotent match-or-create step keyed on vertex identity.
///
/// Exactly one branch applies: `on_match` when a vertex with `id` exists,
/// otherwise `on_create`. A missing branch means "do nothing" for that case, so a
/// merge without `on_create` never creates a vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeV {
    /// Identity criterion; `None` lets the database assign one on create.
    pub id: Option<VertexId>,
    pub label: String,
    pub on_create: Option<PropertyMap>,
    pub on_match: Option<PropertyMap>,
}

impl MergeV {
    pub fn new(id: Option<VertexId>, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            on_create: None,
            on_match: None,
        }
    }

    pub fn on_create(mut self, payload: PropertyMap) -> Self {
        self.on_create = Some(payload);
        self
    }

    pub fn on_match(mut self, payload: PropertyMap) -> Self {
        self.on_match = Some(payload);
        self
    }
}

/// One step of a composed traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    MergeV(MergeV),
    /// Sets a single property on the vertex with `id` and `label`; `None`
    /// removes it, which is how nulls are written.
    SetProperty {
        id: VertexId,
        label: String,
        key: String,
        value: Option<PropertyValue>,
    },
}

/// A chain of steps executed as a single round trip.
///
/// Only the terminal step's element is reported back, mirroring how a chained
/// traversal collapses to one result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_v(mut self, merge: MergeV) -> Self {
        self.steps.push(Step::MergeV(merge));
        self
    }

    pub fn set_property(
        mut self,
        id: VertexId,
        label: impl Into<String>,
        key: impl Into<String>,
        value: Option<PropertyValue>,
    ) -> Self {
        self.steps.push(Step::SetProperty {
            id,
            label: label.into(),
            key: key.into(),
            value,
        });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Represents the interface for interacting with the graph database.
///
/// Implementations own connection management, timeouts and retries. Callers
/// treat a source as a shared handle and never mutate it.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Looks up vertices of `label` by identity, returning one element map per
    /// vertex found.
    ///
    /// Ids that match nothing, or only a vertex of another label, are simply
    /// missing from the result.
    async fn element_maps(
        &self,
        trace_ctx: &TraceContext,
        label: &str,
        ids: &[VertexId],
    ) -> Result<Vec<ElementMap>, GraphSourceError>;

    /// Executes a composed traversal in one round trip.
    ///
    /// Returns the element produced by the terminal step, or `None` if that step
    /// produced no vertex.
    async fn submit(
        &self,
        trace_ctx: &TraceContext,
        traversal: Traversal,
    ) -> Result<Option<ElementMap>, GraphSourceError>;

    /// Removes a single property and returns the value stored afterwards.
    async fn remove_property(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
        key: &str,
    ) -> Result<Option<PropertyValue>, GraphSourceError>;

    /// Deletes the vertex; a no-op when it does not exist.
    async fn drop_vertex(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
    ) -> Result<(), GraphSourceError>;

    /// Looks up a single vertex.
    async fn element_map(
        &self,
        trace_ctx: &TraceContext,
        label: &str,
        id: &VertexId,
    ) -> Result<Option<ElementMap>, GraphSourceError> {
        let mut maps = self.element_maps(trace_ctx, label, std::slice::from_ref(id)).await?;
        Ok(if maps.is_empty() { None } else { Some(maps.swap_remove(0)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_composes_in_order() {
        let id = VertexId::from("v1");
        let traversal = Traversal::new()
            .merge_v(MergeV::new(Some(id.clone()), "person").on_create(PropertyMap::new()))
            .set_property(id.clone(), "person", "sex", None);

        assert_eq!(traversal.len(), 2);
        assert!(matches!(traversal.steps()[0], Step::MergeV(_)));
        assert_eq!(
            traversal.steps()[1],
            Step::SetProperty { id, label: "person".into(), key: "sex".into(), value: None }
        );
    }

    #[test]
    fn test_merge_branches_default_to_none() {
        let merge = MergeV::new(None, "person");
        assert!(merge.on_create.is_none());
        assert!(merge.on_match.is_none());
    }
}
