//! Single-record merge protocol
//!
//! Every write goes through the graph's idempotent merge step, so a
//! get-or-create is one atomic decision on the database rather than a lookup
//! followed by a create that could race another caller.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::data::{
    errors::{OgmError, OgmResult},
    identifiers::VertexId,
    trace_context::TraceContext,
    types::{ElementMap, PropertyMap},
};
use crate::services::sanitize::sanitize;
use crate::traits::{GraphSource, MergeV, Record, Traversal};

/// Create/get/save/delete operations for a single record.
///
/// Implemented for every [`Record`]. Absence is a normal outcome: lookups and
/// merges that produce no vertex return `Ok(None)` or `Ok(false)`.
#[async_trait]
pub trait Vertex: Record {
    /// Loads the vertex with `id`, or `None` if there is no such vertex.
    async fn get_vertex<G>(g: &G, id: &VertexId) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized;

    /// Merges on `id`, applying `fields` only if the vertex has to be created.
    ///
    /// Without an id the database assigns one. The returned record reflects what
    /// the database reports after the merge, not just the input fields.
    async fn create_vertex<G>(
        g: &G,
        id: Option<VertexId>,
        fields: PropertyMap,
    ) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized;

    /// Same round trip as [`Vertex::create_vertex`]; the merge already is a
    /// get-or-create.
    async fn get_or_create_vertex<G>(
        g: &G,
        id: Option<VertexId>,
        fields: PropertyMap,
    ) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized;

    /// Deletes the vertex backing `record`.
    async fn delete_vertex<G>(g: &G, record: &Self) -> OgmResult<()>
    where
        G: GraphSource + ?Sized;

    /// Deletes the vertex with `id`; a no-op if it does not exist.
    async fn delete_vertex_by_id<G>(g: &G, id: &VertexId) -> OgmResult<()>
    where
        G: GraphSource + ?Sized;

    /// Ensures this record exists in the graph and reloads it from there.
    ///
    /// Returns `false` when the merge produced no vertex.
    async fn create<G>(&mut self, g: &G) -> OgmResult<bool>
    where
        G: GraphSource + ?Sized;

    /// Pushes the fields that are set onto the existing vertex, then reloads.
    ///
    /// Never creates. Fields that are `None` locally are left alone on the
    /// server; use [`Vertex::drop_property`] to remove a property. Returns
    /// `false` when no vertex with this id exists.
    async fn save<G>(&mut self, g: &G) -> OgmResult<bool>
    where
        G: GraphSource + ?Sized;

    /// Deletes the backing vertex. The local value is left as is.
    async fn delete<G>(&self, g: &G) -> OgmResult<()>
    where
        G: GraphSource + ?Sized;

    /// Removes one property on the server and mirrors the result locally.
    async fn drop_property<G>(&mut self, g: &G, name: &str) -> OgmResult<()>
    where
        G: GraphSource + ?Sized;
}

/// Builds a record from a merge or lookup result.
fn rehydrate<R: Record>(element: ElementMap) -> OgmResult<R> {
    R::from_properties(sanitize(Some(element))?)
}

fn check_fields<R: Record>(fields: &PropertyMap) -> OgmResult<()> {
    match fields.keys().find(|name| !R::has_field(name)) {
        Some(name) => Err(OgmError::UnknownField {
            label: R::LABEL,
            field: name.clone(),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl<R: Record> Vertex for R {
    #[instrument(skip(g), fields(label = R::LABEL))]
    async fn get_vertex<G>(g: &G, id: &VertexId) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized,
    {
        let trace_ctx = TraceContext::for_operation("get");
        match g.element_map(&trace_ctx.new_child(), R::LABEL, id).await? {
            Some(element) => Ok(Some(rehydrate(element)?)),
            None => {
                debug!(%id, "No vertex found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(g, fields), fields(label = R::LABEL))]
    async fn create_vertex<G>(
        g: &G,
        id: Option<VertexId>,
        fields: PropertyMap,
    ) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized,
    {
        check_fields::<R>(&fields)?;
        let trace_ctx = TraceContext::for_operation("create_vertex");
        let traversal = Traversal::new().merge_v(MergeV::new(id, R::LABEL).on_create(fields));

        match g.submit(&trace_ctx.new_child(), traversal).await? {
            Some(element) => Ok(Some(rehydrate(element)?)),
            None => {
                debug!("Merge produced no vertex");
                Ok(None)
            }
        }
    }

    async fn get_or_create_vertex<G>(
        g: &G,
        id: Option<VertexId>,
        fields: PropertyMap,
    ) -> OgmResult<Option<Self>>
    where
        G: GraphSource + ?Sized,
    {
        Self::create_vertex(g, id, fields).await
    }

    async fn delete_vertex<G>(g: &G, record: &Self) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        record.delete(g).await
    }

    #[instrument(skip(g), fields(label = R::LABEL))]
    async fn delete_vertex_by_id<G>(g: &G, id: &VertexId) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        let trace_ctx = TraceContext::for_operation("delete");
        g.drop_vertex(&trace_ctx.new_child(), id).await?;
        Ok(())
    }

    #[instrument(skip(self, g), fields(label = R::LABEL, id = ?self.id()))]
    async fn create<G>(&mut self, g: &G) -> OgmResult<bool>
    where
        G: GraphSource + ?Sized,
    {
        let trace_ctx = TraceContext::for_operation("create");
        let merge = MergeV::new(self.id().cloned(), R::LABEL).on_create(self.dump_props());

        match g.submit(&trace_ctx.new_child(), Traversal::new().merge_v(merge)).await? {
            Some(element) => {
                self.refresh(sanitize(Some(element))?)?;
                Ok(true)
            }
            None => {
                debug!("Merge produced no vertex");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self, g), fields(label = R::LABEL, id = ?self.id()))]
    async fn save<G>(&mut self, g: &G) -> OgmResult<bool>
    where
        G: GraphSource + ?Sized,
    {
        let id = self
            .id()
            .cloned()
            .ok_or(OgmError::MissingIdentity { label: R::LABEL })?;
        let trace_ctx = TraceContext::for_operation("save");
        let merge = MergeV::new(Some(id), R::LABEL).on_match(self.dump_props());

        // other holders of this vertex may have saved in between, so the
        // server's answer replaces local state
        match g.submit(&trace_ctx.new_child(), Traversal::new().merge_v(merge)).await? {
            Some(element) => {
                self.refresh(sanitize(Some(element))?)?;
                Ok(true)
            }
            None => {
                debug!("No vertex matched on save");
                Ok(false)
            }
        }
    }

    async fn delete<G>(&self, g: &G) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        match self.id() {
            Some(id) => Self::delete_vertex_by_id(g, id).await,
            None => {
                debug!(label = R::LABEL, "Record without id has no vertex to delete");
                Ok(())
            }
        }
    }

    #[instrument(skip(self, g), fields(label = R::LABEL, id = ?self.id()))]
    async fn drop_property<G>(&mut self, g: &G, name: &str) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        if !R::has_field(name) {
            return Err(OgmError::UnknownField {
                label: R::LABEL,
                field: name.to_string(),
            });
        }
        let id = self
            .id()
            .cloned()
            .ok_or(OgmError::MissingIdentity { label: R::LABEL })?;
        let trace_ctx = TraceContext::for_operation("drop_property");

        let remaining = g.remove_property(&trace_ctx.new_child(), &id, name).await?;
        self.apply(name, remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryGraph;
    use crate::data::types::PropertyValue;
    use crate::test_utils::Person;

    fn fields(name: &str, age: i64) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("name".into(), name.into());
        map.insert("age".into(), age.into());
        map
    }

    #[tokio::test]
    async fn test_create_vertex_rejects_undeclared_fields() {
        let g = InMemoryGraph::new();
        let mut payload = fields("fred", 22);
        payload.insert("colour".into(), "blue".into());

        let err = Person::create_vertex(&g, None, payload).await.unwrap_err();
        assert!(matches!(err, OgmError::UnknownField { .. }));
        assert_eq!(g.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_save_without_id_is_an_error() {
        let g = InMemoryGraph::new();
        let mut person = Person::new("fred", 22, None);
        let err = person.save(&g).await.unwrap_err();
        assert!(matches!(err, OgmError::MissingIdentity { label: "person" }));
    }

    #[tokio::test]
    async fn test_save_never_creates() {
        let g = InMemoryGraph::new();
        let mut person = Person::new("fred", 22, None).with_id("ghost");
        assert!(!person.save(&g).await.unwrap());
        assert_eq!(g.vertex_count(), 0);
    }

    #[tokio::test]
    async fn test_create_assigns_database_id() {
        let g = InMemoryGraph::new();
        let mut person = Person::new("fred", 22, Some("m"));
        assert!(person.create(&g).await.unwrap());
        assert!(person.id.is_some());
        assert_eq!(g.vertex_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_property_unknown_field() {
        let g = InMemoryGraph::new();
        let mut person = Person::new("fred", 22, None).with_id("p1");
        let err = person.drop_property(&g, "colour").await.unwrap_err();
        assert!(matches!(err, OgmError::UnknownField { .. }));
    }

    #[tokio::test]
    async fn test_delete_without_id_is_noop() {
        let g = InMemoryGraph::new();
        Person::new("fred", 22, None).delete(&g).await.unwrap();
        assert_eq!(g.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_get_vertex_reads_server_side_extras() {
        let g = InMemoryGraph::new();
        let created = Person::create_vertex(&g, None, fields("fred", 22))
            .await
            .unwrap()
            .unwrap();
        let id = created.id.clone().unwrap();
        g.set_raw_property(&id, "sex", PropertyValue::from("m"));

        let loaded = Person::get_vertex(&g, &id).await.unwrap().unwrap();
        assert_eq!(loaded.sex.as_deref(), Some("m"));
    }
}
