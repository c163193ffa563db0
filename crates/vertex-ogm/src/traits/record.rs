//! Record trait: the typed side of a vertex

use std::collections::HashMap;
use tracing::debug;

use crate::data::{
    errors::OgmError,
    identifiers::VertexId,
    types::{PropertyMap, PropertyValue},
};

/// Field name to value, where `None` marks a declared field that is unset.
pub type FieldMap = HashMap<String, Option<PropertyValue>>;

/// Controls how a record serializes into a field map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpOptions {
    /// Leave out fields whose value is `None`.
    pub exclude_none: bool,
    /// Add a `label` entry carrying the record's label.
    pub include_label: bool,
}

impl DumpOptions {
    /// The payload shape used for merge branches.
    pub fn merge_payload() -> Self {
        Self {
            exclude_none: true,
            include_label: false,
        }
    }
}

/// A typed schema whose instances map onto vertices.
///
/// Implementations are normally generated with [`crate::vertex_record!`].
/// Equality and hashing of records are expected to use `id` alone.
pub trait Record: Send + Sync + Sized {
    /// Stable vertex label, conventionally the lowercased type name.
    const LABEL: &'static str;

    fn id(&self) -> Option<&VertexId>;

    fn set_id(&mut self, id: Option<VertexId>);

    /// Declared field names, in declaration order. Excludes `id` and `label`.
    fn field_names() -> &'static [&'static str];

    /// Current field values, in declaration order.
    fn fields(&self) -> Vec<(&'static str, Option<PropertyValue>)>;

    /// Assigns one declared field. `None` clears it.
    fn apply(&mut self, name: &str, value: Option<PropertyValue>) -> Result<(), OgmError>;

    /// An instance with no id and every field unset.
    fn empty() -> Self;

    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn has_field(name: &str) -> bool {
        Self::field_names().contains(&name)
    }

    /// Serializes the declared fields (never the id).
    ///
    /// With `exclude_none` unset, fields currently `None` appear as `None`
    /// entries so callers can tell "unset" from "not declared".
    fn dump(&self, options: DumpOptions) -> FieldMap {
        let mut dumped: FieldMap = self
            .fields()
            .into_iter()
            .filter(|(_, value)| !(options.exclude_none && value.is_none()))
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        if options.include_label {
            dumped.insert("label".to_string(), Some(PropertyValue::String(Self::LABEL.to_string())));
        }
        dumped
    }

    /// The property map sent in a merge branch: set fields only, no label.
    fn dump_props(&self) -> PropertyMap {
        self.dump(DumpOptions::merge_payload())
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect()
    }

    /// Assigns the entries present in `props`, leaving other fields untouched.
    ///
    /// `id` replaces the identity, `label` is ignored, and keys the schema does
    /// not declare are skipped.
    fn update(&mut self, props: PropertyMap) -> Result<&mut Self, OgmError> {
        for (key, value) in props {
            match key.as_str() {
                "id" => self.set_id(Some(property_to_id(value))),
                "label" => {}
                name if Self::has_field(name) => self.apply(name, Some(value))?,
                other => debug!(label = Self::LABEL, field = other, "Ignoring undeclared property"),
            }
        }
        Ok(self)
    }

    /// Overwrites every declared field from `props`; fields it lacks become `None`.
    ///
    /// The new state is built on a scratch copy first. On error `self` is left
    /// exactly as it was.
    fn refresh(&mut self, mut props: PropertyMap) -> Result<&mut Self, OgmError> {
        let mut fresh = Self::empty();
        fresh.set_id(self.id().cloned());
        for name in Self::field_names() {
            let value = props.remove(*name);
            fresh.apply(name, value)?;
        }
        fresh.update(props)?;
        *self = fresh;
        Ok(self)
    }

    /// Builds a record from a sanitized property map.
    fn from_properties(props: PropertyMap) -> Result<Self, OgmError> {
        let mut record = Self::empty();
        record.update(props)?;
        Ok(record)
    }
}

/// Reads an `id` entry of a sanitized map back into a vertex id.
fn property_to_id(value: PropertyValue) -> VertexId {
    match value {
        PropertyValue::Integer(i) => VertexId::Int(i),
        PropertyValue::String(s) => VertexId::Str(s),
        other => VertexId::Str(other.to_string()),
    }
}
