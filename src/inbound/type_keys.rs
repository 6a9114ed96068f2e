//! Canonical type tags for polymorphic relationships
//!
//! Normalizes
//!
//! ```json
//! {"minion": 1, "minion_type": "evil_minion", "author": {"kind": "user", "id": 1}}
//! ```
//!
//! into
//!
//! ```json
//! {"minion": 1, "minionType": "evil_minion", "author": {"type": "user", "id": 1}}
//! ```
//!
//! when `minion` and `author` are polymorphic and `author` declares `kind`
//! as its embedded type key.

use crate::inflect::camelize_type_key;
use crate::registry::RelationshipDescriptor;
use crate::types::{TetherConfig, CANONICAL_TYPE_KEY};
use serde_json::{Map, Value};

/// Rewrite the type-tag fields of every polymorphic relationship in `payload`
pub fn normalize_type_keys(
    relationships: &[RelationshipDescriptor],
    payload: &mut Map<String, Value>,
    config: &TetherConfig,
) {
    for relationship in relationships.iter().filter(|r| r.is_polymorphic()) {
        let type_key = config.type_key(&relationship.key);
        if payload.get(&type_key).is_some_and(is_truthy) {
            if let Some(camel) = camelize_type_key(&type_key, &config.type_key_suffix) {
                if let Some(tag) = payload.remove(&type_key) {
                    payload.insert(camel, tag);
                }
            }
        }

        let embedded_type_key = relationship
            .embedded_type_key()
            .unwrap_or(&config.embedded_type_key);
        if embedded_type_key == CANONICAL_TYPE_KEY {
            continue;
        }

        match payload.get_mut(&relationship.key) {
            Some(Value::Array(elements)) => {
                for element in elements.iter_mut() {
                    if let Value::Object(obj) = element {
                        rename_type_tag(obj, embedded_type_key);
                    }
                }
            }
            Some(Value::Object(obj)) => {
                if obj.get(embedded_type_key).is_some_and(is_truthy) {
                    rename_type_tag(obj, embedded_type_key);
                }
            }
            _ => {}
        }
    }
}

/// Move `obj[key]` to `obj["type"]`
fn rename_type_tag(obj: &mut Map<String, Value>, key: &str) {
    if let Some(tag) = obj.remove(key) {
        obj.insert(CANONICAL_TYPE_KEY.to_string(), tag);
    }
}

/// Empty strings, zero, `false` and `null` do not count as a tag
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
