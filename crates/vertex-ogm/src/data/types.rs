//! Property values exchanged with the graph

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::data::errors::OgmError;
use crate::data::identifiers::Identity;

/// A single vertex property value.
///
/// There is no null variant: a property that is not set is simply missing from
/// its `PropertyMap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
}

/// Field name to value; keys missing from the map are absent properties.
pub type PropertyMap = HashMap<String, PropertyValue>;

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Short type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::List(_) => "list",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Integer(i) => serde_json::json!(i),
            PropertyValue::Float(f) => serde_json::json!(f),
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::List(items) => {
                serde_json::Value::Array(items.iter().map(|item| item.to_json()).collect())
            }
        }
    }

    /// Converts a JSON value; `null` and objects have no property representation.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
            serde_json::Value::Bool(b) => Some(PropertyValue::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(PropertyValue::Integer)
                .or_else(|| n.as_f64().map(PropertyValue::Float)),
            serde_json::Value::String(s) => Some(PropertyValue::String(s)),
            serde_json::Value::Array(items) => Some(PropertyValue::List(
                items.into_iter().filter_map(PropertyValue::from_json).collect(),
            )),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::List(items) => write!(f, "{:?}", items),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        value.to_json()
    }
}

/// A raw element map as a graph query returns it.
///
/// The identity and label tokens live in their own slots; they must go through
/// [`crate::services::sanitize`] before the map can populate a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementMap {
    pub id: Option<Identity>,
    pub label: Option<String>,
    pub properties: PropertyMap,
}

impl ElementMap {
    pub fn new(id: impl Into<Identity>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: Some(label.into()),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Conversion between a typed record field and its property representation.
pub trait FieldValue: Sized {
    /// Name of the expected property type, for error messages.
    const EXPECTED: &'static str;

    fn into_property(self) -> PropertyValue;

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError>;
}

impl FieldValue for String {
    const EXPECTED: &'static str = "string";

    fn into_property(self) -> PropertyValue {
        PropertyValue::String(self)
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::String(s) => Ok(s),
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}

impl FieldValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn into_property(self) -> PropertyValue {
        PropertyValue::Integer(self)
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::Integer(i) => Ok(i),
            // numeric strings coerce, e.g. an age supplied as "22"
            PropertyValue::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| OgmError::field_type(field, Self::EXPECTED, &value)),
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}

impl FieldValue for i32 {
    const EXPECTED: &'static str = "32-bit integer";

    fn into_property(self) -> PropertyValue {
        PropertyValue::Integer(self as i64)
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        let wide = i64::from_property(field, value)?;
        i32::try_from(wide).map_err(|_| OgmError::field_type(field, Self::EXPECTED, wide))
    }
}

impl FieldValue for f64 {
    const EXPECTED: &'static str = "float";

    fn into_property(self) -> PropertyValue {
        PropertyValue::Float(self)
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::Float(f) => Ok(f),
            PropertyValue::Integer(i) => Ok(i as f64),
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}

impl FieldValue for bool {
    const EXPECTED: &'static str = "bool";

    fn into_property(self) -> PropertyValue {
        PropertyValue::Bool(self)
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::Bool(b) => Ok(b),
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}

impl FieldValue for Uuid {
    const EXPECTED: &'static str = "uuid string";

    fn into_property(self) -> PropertyValue {
        PropertyValue::String(self.to_string())
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::String(ref s) => {
                Uuid::parse_str(s).map_err(|_| OgmError::field_type(field, Self::EXPECTED, &value))
            }
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn into_property(self) -> PropertyValue {
        PropertyValue::List(self.into_iter().map(FieldValue::into_property).collect())
    }

    fn from_property(field: &str, value: PropertyValue) -> Result<Self, OgmError> {
        match value {
            PropertyValue::List(items) => items
                .into_iter()
                .map(|item| T::from_property(field, item))
                .collect(),
            other => Err(OgmError::field_type(field, Self::EXPECTED, other)),
        }
    }
}
