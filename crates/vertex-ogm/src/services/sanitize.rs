//! Turns raw element maps into record-ready property maps

use crate::data::{
    errors::OgmError,
    identifiers::{normalize, Token},
    types::{ElementMap, PropertyMap, PropertyValue},
};

/// Re-keys the identity and label tokens of a raw element map as plain `id` and
/// `label` entries.
///
/// The identity is normalized and always stored as a string. An element map
/// without an identity token produces no `id` entry. A missing map is a
/// contract violation: callers decide "no such vertex" before getting here.
pub fn sanitize(raw: Option<ElementMap>) -> Result<PropertyMap, OgmError> {
    let ElementMap { id, label, properties } = raw.ok_or_else(|| {
        OgmError::MalformedPropertyMap("'None' is not a property map".to_string())
    })?;

    let mut sanitized = properties;
    match id {
        Some(identity) => {
            let id = normalize(identity).to_string();
            sanitized.insert(Token::Id.name().to_string(), PropertyValue::String(id));
        }
        None => {
            sanitized.remove(Token::Id.name());
        }
    }
    match label {
        Some(label) => {
            sanitized.insert(Token::Label.name().to_string(), PropertyValue::String(label));
        }
        None => {
            sanitized.remove(Token::Label.name());
        }
    }

    Ok(sanitized)
}
