//! In-process graph used by tests and by callers that need no server

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::data::{
    errors::GraphSourceError,
    identifiers::{Identity, Token, VertexId},
    trace_context::TraceContext,
    types::{ElementMap, PropertyMap, PropertyValue},
};
use crate::traits::{GraphSource, MergeV, Step, Traversal};

#[derive(Debug, Clone)]
struct StoredVertex {
    identity: Identity,
    label: String,
    properties: PropertyMap,
}

impl StoredVertex {
    fn element_map(&self) -> ElementMap {
        ElementMap {
            id: Some(self.identity.clone()),
            label: Some(self.label.clone()),
            properties: self.properties.clone(),
        }
    }

    fn assign(&mut self, payload: PropertyMap) {
        for (key, value) in payload {
            if !is_reserved(&key) {
                self.properties.insert(key, value);
            }
        }
    }
}

fn is_reserved(key: &str) -> bool {
    key == Token::Id.name() || key == Token::Label.name()
}

/// A property graph held in memory.
///
/// Vertices created without an id get a UUID, reported back as a UUID identity
/// the way remote providers do. Each traversal runs under a single write lock,
/// so concurrent merges on the same id resolve to exactly one vertex.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    vertices: RwLock<HashMap<String, StoredVertex>>,
    round_trips: AtomicUsize,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.read().len()
    }

    pub fn count_label(&self, label: &str) -> usize {
        self.vertices
            .read()
            .values()
            .filter(|vertex| vertex.label == label)
            .count()
    }

    /// Reads one stored property, bypassing the round trip counter.
    pub fn property(&self, id: &VertexId, key: &str) -> Option<PropertyValue> {
        self.vertices
            .read()
            .get(&id.key())
            .and_then(|vertex| vertex.properties.get(key).cloned())
    }

    /// Writes one property directly, as another client of the database would.
    pub fn set_raw_property(&self, id: &VertexId, key: &str, value: PropertyValue) {
        if let Some(vertex) = self.vertices.write().get_mut(&id.key()) {
            vertex.properties.insert(key.to_string(), value);
        }
    }

    /// Number of calls made through [`GraphSource`].
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.vertices.write().clear();
    }

    fn count_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }

    fn merge(
        vertices: &mut HashMap<String, StoredVertex>,
        merge: MergeV,
    ) -> Result<Option<ElementMap>, GraphSourceError> {
        let MergeV {
            id,
            label,
            on_create,
            on_match,
        } = merge;

        if let Some(id) = &id {
            if let Some(existing) = vertices.get_mut(&id.key()) {
                if existing.label != label {
                    return Err(GraphSourceError::QueryError(format!(
                        "Vertex {} already exists with label '{}', cannot merge as '{}'",
                        id, existing.label, label
                    )));
                }
                if let Some(payload) = on_match {
                    existing.assign(payload);
                }
                return Ok(Some(existing.element_map()));
            }
        }

        let payload = match on_create {
            Some(payload) => payload,
            None => return Ok(None),
        };
        let identity = match id {
            Some(id) => Identity::from(id),
            None => Identity::Uuid(Uuid::new_v4()),
        };
        let key = match &identity {
            Identity::Uuid(uuid) => uuid.to_string(),
            Identity::Int(i) => i.to_string(),
            Identity::Str(s) => s.clone(),
            Identity::Token(token) => token.name().to_string(),
        };

        let mut vertex = StoredVertex {
            identity,
            label,
            properties: PropertyMap::new(),
        };
        vertex.assign(payload);
        let element = vertex.element_map();
        vertices.insert(key, vertex);
        Ok(Some(element))
    }
}

#[async_trait]
impl GraphSource for InMemoryGraph {
    #[instrument(skip(self, trace_ctx, ids), fields(trace_id = %trace_ctx.trace_id, count = ids.len()))]
    async fn element_maps(
        &self,
        trace_ctx: &TraceContext,
        label: &str,
        ids: &[VertexId],
    ) -> Result<Vec<ElementMap>, GraphSourceError> {
        self.count_trip();
        let vertices = self.vertices.read();
        Ok(ids
            .iter()
            .filter_map(|id| vertices.get(&id.key()))
            .filter(|vertex| vertex.label == label)
            .map(StoredVertex::element_map)
            .collect())
    }

    #[instrument(skip(self, trace_ctx, traversal), fields(trace_id = %trace_ctx.trace_id, steps = traversal.len()))]
    async fn submit(
        &self,
        trace_ctx: &TraceContext,
        traversal: Traversal,
    ) -> Result<Option<ElementMap>, GraphSourceError> {
        if traversal.is_empty() {
            return Err(GraphSourceError::InvalidInput("empty traversal".to_string()));
        }
        self.count_trip();

        let mut vertices = self.vertices.write();
        let mut terminal = None;
        for step in traversal.into_steps() {
            terminal = match step {
                Step::MergeV(merge) => Self::merge(&mut vertices, merge)?,
                Step::SetProperty { id, label, key, value } => match vertices.get_mut(&id.key()) {
                    Some(vertex) if vertex.label == label => {
                        match value {
                            Some(value) => {
                                vertex.properties.insert(key, value);
                            }
                            None => {
                                vertex.properties.remove(&key);
                            }
                        }
                        Some(vertex.element_map())
                    }
                    _ => {
                        debug!(%id, %label, "Property step on missing vertex");
                        None
                    }
                },
            };
        }
        Ok(terminal)
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    async fn remove_property(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
        key: &str,
    ) -> Result<Option<PropertyValue>, GraphSourceError> {
        self.count_trip();
        let mut vertices = self.vertices.write();
        match vertices.get_mut(&id.key()) {
            Some(vertex) => {
                vertex.properties.remove(key);
                Ok(vertex.properties.get(key).cloned())
            }
            None => {
                debug!(%id, "Dropping property of missing vertex");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    async fn drop_vertex(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
    ) -> Result<(), GraphSourceError> {
        self.count_trip();
        if self.vertices.write().remove(&id.key()).is_none() {
            debug!(%id, "No vertex to drop");
        }
        Ok(())
    }
}
