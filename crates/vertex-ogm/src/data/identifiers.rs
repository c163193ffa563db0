//! Vertex identity types and the identity normalizer

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reserved graph tokens that appear as keys in raw element maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Id,
    Label,
}

impl Token {
    /// Symbolic name of the token.
    pub fn name(&self) -> &'static str {
        match self {
            Token::Id => "id",
            Token::Label => "label",
        }
    }
}

/// Any identity representation a graph provider or caller may hand us.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Token(Token),
    Uuid(Uuid),
    Str(String),
    Int(i64),
}

/// Canonical vertex identity, usable both as a lookup key and as a record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VertexId {
    Int(i64),
    Str(String),
}

impl VertexId {
    /// Generates a fresh string id.
    pub fn generate() -> Self {
        VertexId::Str(Uuid::new_v4().to_string())
    }

    /// Comparison key; `Int(7)` and `Str("7")` address the same vertex.
    pub fn key(&self) -> String {
        match self {
            VertexId::Int(i) => i.to_string(),
            VertexId::Str(s) => s.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VertexId::Str(s) => Some(s),
            VertexId::Int(_) => None,
        }
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Int(i) => write!(f, "{}", i),
            VertexId::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Converts any boundary identity into its canonical form.
///
/// UUIDs become their hyphenated string, tokens become their symbolic name and
/// plain strings or integers pass through. Total over every `Identity` variant.
pub fn normalize(identity: impl Into<Identity>) -> VertexId {
    match identity.into() {
        Identity::Token(token) => VertexId::Str(token.name().to_string()),
        Identity::Uuid(uuid) => VertexId::Str(uuid.to_string()),
        Identity::Str(s) => VertexId::Str(s),
        Identity::Int(i) => VertexId::Int(i),
    }
}

impl From<Token> for Identity {
    fn from(token: Token) -> Self {
        Identity::Token(token)
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Identity::Uuid(uuid)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity::Str(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity::Str(s.to_string())
    }
}

impl From<i64> for Identity {
    fn from(i: i64) -> Self {
        Identity::Int(i)
    }
}

impl From<VertexId> for Identity {
    fn from(id: VertexId) -> Self {
        match id {
            VertexId::Int(i) => Identity::Int(i),
            VertexId::Str(s) => Identity::Str(s),
        }
    }
}

impl From<&VertexId> for Identity {
    fn from(id: &VertexId) -> Self {
        id.clone().into()
    }
}

impl From<Uuid> for VertexId {
    fn from(uuid: Uuid) -> Self {
        normalize(uuid)
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        VertexId::Str(s)
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        VertexId::Str(s.to_string())
    }
}

impl From<i64> for VertexId {
    fn from(i: i64) -> Self {
        VertexId::Int(i)
    }
}
