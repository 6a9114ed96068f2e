//! Outbound serialization - records back into wire payloads
//!
//! The mirror of the inbound path: relationships become foreign keys again,
//! polymorphic references get a `<key>_type` sibling, and read-only fields
//! are left out entirely.

use crate::error::{Error, Result};
use crate::inflect::underscore;
use crate::record::{Record, Relation};
use crate::registry::{Inverse, RelationshipDescriptor, RelationshipKind, TypeDescriptor};
use crate::types::TetherConfig;
use serde_json::{Map, Value};
use tracing::debug;

/// Serialize a record of the type described by `descriptor`
pub fn serialize_record(descriptor: &TypeDescriptor, record: &Record, config: &TetherConfig) -> Result<Map<String, Value>> {
    let mut json = Map::new();

    if config.include_id {
        if let Some(id) = &record.id {
            json.insert(descriptor.primary_key.clone(), id.to_value());
        }
    }

    serialize_attributes(descriptor, record, &mut json);
    serialize_relationships(descriptor, record, &mut json, config)?;

    Ok(json)
}

/// Copy every attribute not marked read-only
pub fn serialize_attributes(descriptor: &TypeDescriptor, record: &Record, json: &mut Map<String, Value>) {
    for (name, value) in &record.attributes {
        if descriptor.is_read_only_attribute(name) {
            continue;
        }
        json.insert(name.clone(), value.clone());
    }
}

/// Write the wire form of every writable relationship of `record` into `json`
pub fn serialize_relationships(
    descriptor: &TypeDescriptor,
    record: &Record,
    json: &mut Map<String, Value>,
    config: &TetherConfig,
) -> Result<()> {
    for relationship in descriptor.relationships.iter().filter(|r| !r.read_only) {
        let relation = record.relation(&relationship.key);

        match &relationship.kind {
            RelationshipKind::Reference { .. } => {
                json.insert(relationship.key.clone(), reference_value(relationship, relation)?);
            }
            RelationshipKind::PolymorphicReference { .. } => {
                json.insert(relationship.key.clone(), reference_value(relationship, relation)?);
                json.insert(config.type_key(&relationship.key), polymorphic_type(relation));
            }
            RelationshipKind::Collection { inverse, .. } => match inverse {
                Inverse::None | Inverse::Many => {
                    json.insert(relationship.key.clone(), collection_value(relationship, relation)?);
                }
                // many-to-one links are written through the owning side
                Inverse::One => {
                    debug!(key = %relationship.key, "skipping many-to-one collection");
                }
            },
            RelationshipKind::PolymorphicCollection { .. } => {
                return Err(Error::UnsupportedOperation(format!(
                    "serializing polymorphic collection `{}` of {}",
                    relationship.key, descriptor.name
                )));
            }
        }
    }

    Ok(())
}

fn reference_value(relationship: &RelationshipDescriptor, relation: &Relation) -> Result<Value> {
    match relation {
        Relation::Unset => Ok(Value::Null),
        Relation::Entity(entity) => Ok(entity.id.to_value()),
        Relation::Raw(value) => Ok(value.clone()),
        Relation::Many(_) => Err(mismatch(relationship, "a collection")),
    }
}

fn collection_value(relationship: &RelationshipDescriptor, relation: &Relation) -> Result<Value> {
    match relation {
        Relation::Unset => Ok(Value::Array(Vec::new())),
        Relation::Many(entities) => Ok(Value::Array(entities.iter().map(|e| e.id.to_value()).collect())),
        Relation::Raw(value) => Ok(value.clone()),
        Relation::Entity(_) => Err(mismatch(relationship, "a single entity")),
    }
}

/// `<key>_type` value: the underscored concrete type, `null` when unknown
fn polymorphic_type(relation: &Relation) -> Value {
    match relation {
        Relation::Entity(entity) => Value::String(underscore(&entity.type_name)),
        Relation::Unset | Relation::Raw(_) | Relation::Many(_) => Value::Null,
    }
}

fn mismatch(relationship: &RelationshipDescriptor, held: &str) -> Error {
    Error::UnsupportedOperation(format!(
        "relationship `{}` holds {} that does not match its kind",
        relationship.key, held
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityRef;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("post")
            .with_attribute("title")
            .with_read_only_attribute("created_at")
            .with_relationship(RelationshipDescriptor::reference("author", "user"))
            .with_relationship(RelationshipDescriptor::polymorphic_reference("subject", "subject"))
            .with_relationship(RelationshipDescriptor::collection("tags", "tag", Inverse::None))
            .with_relationship(RelationshipDescriptor::collection("readers", "user", Inverse::Many))
            .with_relationship(RelationshipDescriptor::collection("comments", "comment", Inverse::One))
            .with_relationship(RelationshipDescriptor::reference("editor", "user").read_only())
    }

    fn object(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_serialize_record() {
        let record = Record::new("post")
            .with_id(1)
            .with_attribute("title", json!("Hello"))
            .with_attribute("created_at", json!("2024-01-01T00:00:00Z"))
            .with_relation("author", Relation::Entity(EntityRef::new("user", 5)))
            .with_relation("subject", Relation::Entity(EntityRef::new("EvilMinion", 9)))
            .with_relation("tags", Relation::Many(vec![EntityRef::new("tag", "rust")]))
            .with_relation("readers", Relation::Many(vec![EntityRef::new("user", 5), EntityRef::new("user", 6)]))
            .with_relation("comments", Relation::Many(vec![EntityRef::new("comment", 10)]))
            .with_relation("editor", Relation::Entity(EntityRef::new("user", 7)));

        let json = serialize_record(&descriptor(), &record, &TetherConfig::default()).unwrap();

        assert_eq!(
            json,
            object(json!({
                "title": "Hello",
                "author": 5,
                "subject": 9,
                "subject_type": "evil_minion",
                "tags": ["rust"],
                "readers": [5, 6]
            }))
        );
    }

    #[test]
    fn test_unset_and_raw_references() {
        let record = Record::new("post")
            .with_relation("author", Relation::Raw(json!("5")))
            .with_relation("subject", Relation::Unset);

        let json = serialize_record(&descriptor(), &record, &TetherConfig::default()).unwrap();

        assert_eq!(json["author"], json!("5"));
        assert_eq!(json["subject"], Value::Null);
        assert_eq!(json["subject_type"], Value::Null);
        assert_eq!(json["tags"], json!([]));
    }

    #[test]
    fn test_read_only_attributes_never_emitted() {
        let record = Record::new("post")
            .with_attribute("created_at", json!(null))
            .with_attribute("title", json!("x"));

        let json = serialize_record(&descriptor(), &record, &TetherConfig::default()).unwrap();

        assert!(!json.contains_key("created_at"));
        assert!(!json.contains_key("editor"));
        assert!(json.contains_key("title"));
    }

    #[test]
    fn test_include_id() {
        let config = TetherConfig {
            include_id: true,
            ..TetherConfig::default()
        };
        let record = Record::new("post").with_id("abc");

        let json = serialize_record(&descriptor(), &record, &config).unwrap();

        assert_eq!(json["id"], json!("abc"));
    }

    #[test]
    fn test_polymorphic_collection_is_unsupported() {
        let descriptor = TypeDescriptor::new("post")
            .with_relationship(RelationshipDescriptor::polymorphic_collection("attachments", "attachment"));

        let result = serialize_record(&descriptor, &Record::new("post"), &TetherConfig::default());

        assert!(matches!(result, Err(Error::UnsupportedOperation(msg)) if msg.contains("attachments")));
    }

    #[test]
    fn test_read_only_polymorphic_collection_is_skipped() {
        let descriptor = TypeDescriptor::new("post").with_relationship(
            RelationshipDescriptor::polymorphic_collection("attachments", "attachment").read_only(),
        );

        let json = serialize_record(&descriptor, &Record::new("post"), &TetherConfig::default()).unwrap();

        assert!(json.is_empty());
    }
}
