use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Represents a unique identifier for an entity
///
/// Integer and string ids are kept apart so an id read off the wire is
/// written back with the same JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    /// Unsigned ids too large for `i64`
    UInt(u64),
    Text(String),
}

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId::Text(id.into())
    }

    /// Read an id from a JSON value. Only integers and strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(EntityId::Int)
                .or_else(|| n.as_u64().map(EntityId::UInt)),
            Value::String(s) => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Int(n) => Value::from(*n),
            EntityId::UInt(n) => Value::from(*n),
            EntityId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId::Int(i64::from(id))
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::new(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::UInt(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

/// A typed pointer at an entity held by the graph store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub type_name: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: impl Into<EntityId>) -> Self {
        EntityRef {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Configuration for normalizing and serializing payloads
#[derive(Debug, Clone)]
pub struct TetherConfig {
    /// Suffix of the sibling field carrying a polymorphic relationship's type tag
    pub type_key_suffix: String,

    /// Field inside embedded polymorphic data holding the type tag on the wire
    pub embedded_type_key: String,

    /// Maximum depth of embedded data folded into the graph (0 = root relationships only)
    pub max_depth: usize,

    /// Whether outbound payloads carry the record's own primary key
    pub include_id: bool,
}

impl TetherConfig {
    /// `author` -> `author_type`
    pub fn type_key(&self, key: &str) -> String {
        format!("{}{}", key, self.type_key_suffix)
    }
}

impl Default for TetherConfig {
    fn default() -> Self {
        TetherConfig {
            type_key_suffix: String::from("_type"),
            embedded_type_key: String::from(CANONICAL_TYPE_KEY),
            max_depth: 10,
            include_id: false,
        }
    }
}

/// Field that holds the concrete type of embedded polymorphic data after normalization
pub const CANONICAL_TYPE_KEY: &str = "type";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_from_json() {
        assert_eq!(EntityId::from_value(&json!(7)), Some(EntityId::Int(7)));
        assert_eq!(EntityId::from_value(&json!("abc")), Some(EntityId::new("abc")));
        assert_eq!(EntityId::from_value(&json!(1.5)), None);
        assert_eq!(EntityId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_ids_above_i64_range_keep_their_value() {
        let wire = json!(u64::MAX);
        let id = EntityId::from_value(&wire).unwrap();

        assert_eq!(id, EntityId::UInt(u64::MAX));
        assert_eq!(id.to_value(), wire);
        assert_eq!(id.to_string(), "18446744073709551615");
        assert_eq!(serde_json::from_value::<EntityId>(wire).unwrap(), id);
    }
}
