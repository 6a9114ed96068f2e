//! In-memory records handed to the outbound serializer

use crate::error::{Error, Result};
use crate::inflect::camelize_type_key;
use crate::registry::{RelationshipDescriptor, RelationshipKind, TypeRegistry};
use crate::types::{EntityId, EntityRef, TetherConfig, CANONICAL_TYPE_KEY};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// What a record currently holds for one relationship
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Relation {
    #[default]
    Unset,
    /// A resolved related entity
    Entity(EntityRef),
    /// A value never resolved to an entity, sent back as is
    Raw(Value),
    Many(Vec<EntityRef>),
}

/// An entity as the client-side data layer holds it
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub id: Option<EntityId>,
    pub attributes: Map<String, Value>,
    pub relations: BTreeMap<String, Relation>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            id: None,
            attributes: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_relation(mut self, key: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(key.into(), relation);
        self
    }

    /// `Relation::Unset` for relationships the record has never seen
    pub fn relation(&self, key: &str) -> &Relation {
        static UNSET: Relation = Relation::Unset;
        self.relations.get(key).unwrap_or(&UNSET)
    }

    /// Materialize a record from the flat form produced by the inbound path
    pub fn from_normalized<R: TypeRegistry + ?Sized>(
        registry: &R,
        type_name: &str,
        normalized: &Map<String, Value>,
        config: &TetherConfig,
    ) -> Result<Self> {
        let descriptor = registry
            .descriptor(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;

        let mut record = Record::new(descriptor.name.clone());
        record.id = normalized.get(&descriptor.primary_key).and_then(EntityId::from_value);

        // `<key>Type` fields belong to their polymorphic relationship
        let type_fields: Vec<String> = descriptor
            .relationships
            .iter()
            .filter(|r| r.is_polymorphic())
            .filter_map(|r| camelize_type_key(&config.type_key(&r.key), &config.type_key_suffix))
            .collect();

        for (field, value) in normalized {
            if *field == descriptor.primary_key || type_fields.contains(field) {
                continue;
            }
            match descriptor.relationship(field) {
                Some(relationship) => {
                    let relation = materialize(registry, relationship, value, normalized, config)?;
                    record.relations.insert(field.clone(), relation);
                }
                None => {
                    record.attributes.insert(field.clone(), value.clone());
                }
            }
        }

        Ok(record)
    }
}

fn materialize<R: TypeRegistry + ?Sized>(
    registry: &R,
    relationship: &RelationshipDescriptor,
    value: &Value,
    normalized: &Map<String, Value>,
    config: &TetherConfig,
) -> Result<Relation> {
    if value.is_null() {
        return Ok(Relation::Unset);
    }

    let relation = match &relationship.kind {
        RelationshipKind::Reference { target } => match entity_ref(registry, target, value)? {
            Some(entity) => Relation::Entity(entity),
            None => Relation::Raw(value.clone()),
        },
        RelationshipKind::PolymorphicReference { target, .. } => {
            let sibling_tag = camelize_type_key(&config.type_key(&relationship.key), &config.type_key_suffix)
                .and_then(|field| normalized.get(&field))
                .and_then(Value::as_str);
            // Embedded tag first, then the `<key>Type` sibling, then the declared target
            let tag = value.get(CANONICAL_TYPE_KEY).and_then(Value::as_str).or(sibling_tag);
            let type_name = match tag {
                Some(tag) => resolve(registry, tag)?,
                None => target.clone(),
            };
            match entity_ref(registry, &type_name, value)? {
                Some(entity) => Relation::Entity(entity),
                None => Relation::Raw(value.clone()),
            }
        }
        RelationshipKind::Collection { target, .. } => match value {
            Value::Array(elements) => Relation::Many(
                elements
                    .iter()
                    .map(|element| entity_ref(registry, target, element))
                    .filter_map(Result::transpose)
                    .collect::<Result<_>>()?,
            ),
            other => Relation::Raw(other.clone()),
        },
        RelationshipKind::PolymorphicCollection { target, .. } => match value {
            Value::Array(elements) => {
                let mut entities = Vec::with_capacity(elements.len());
                for element in elements {
                    let type_name = tagged_type(registry, element, target)?;
                    if let Some(entity) = entity_ref(registry, &type_name, element)? {
                        entities.push(entity);
                    }
                }
                Relation::Many(entities)
            }
            other => Relation::Raw(other.clone()),
        },
    };

    Ok(relation)
}

/// Reference to a `type_name` entity from either a bare id or embedded data
fn entity_ref<R: TypeRegistry + ?Sized>(registry: &R, type_name: &str, value: &Value) -> Result<Option<EntityRef>> {
    let id = match value {
        Value::Object(obj) => obj.get(registry.primary_key_of(type_name)),
        other => Some(other),
    };
    Ok(id.and_then(EntityId::from_value).map(|id| EntityRef {
        type_name: type_name.to_string(),
        id,
    }))
}

/// Type named by the `type` tag of embedded data, or `declared` for bare ids and untagged data
fn tagged_type<R: TypeRegistry + ?Sized>(registry: &R, value: &Value, declared: &str) -> Result<String> {
    match value.get(CANONICAL_TYPE_KEY).and_then(Value::as_str) {
        Some(tag) => resolve(registry, tag),
        None => Ok(declared.to_string()),
    }
}

fn resolve<R: TypeRegistry + ?Sized>(registry: &R, tag: &str) -> Result<String> {
    registry
        .resolve_type(tag)
        .map(|descriptor| descriptor.name.clone())
        .ok_or_else(|| Error::UnknownType(tag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Inverse, SchemaRegistry, TypeDescriptor};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_type(
                TypeDescriptor::new("post")
                    .with_relationship(RelationshipDescriptor::reference("author", "user"))
                    .with_relationship(RelationshipDescriptor::collection("tags", "tag", Inverse::Many))
                    .with_relationship(RelationshipDescriptor::polymorphic_reference("subject", "subject")),
            )
            .with_type(TypeDescriptor::new("user"))
            .with_type(TypeDescriptor::new("tag").with_primary_key("slug"))
            .with_type(TypeDescriptor::new("photo"))
    }

    fn object(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_normalized() {
        let registry = registry();
        let normalized = object(json!({
            "id": 1,
            "title": "Hello",
            "author": 5,
            "tags": ["rust", "json"],
            "subject": {"type": "photo", "id": 3}
        }));

        let record = Record::from_normalized(&registry, "post", &normalized, &TetherConfig::default()).unwrap();

        assert_eq!(record.id, Some(EntityId::Int(1)));
        assert_eq!(record.attributes, object(json!({"title": "Hello"})));
        assert_eq!(record.relation("author"), &Relation::Entity(EntityRef::new("user", 5)));
        assert_eq!(
            record.relation("tags"),
            &Relation::Many(vec![EntityRef::new("tag", "rust"), EntityRef::new("tag", "json")])
        );
        assert_eq!(record.relation("subject"), &Relation::Entity(EntityRef::new("photo", 3)));
    }

    #[test]
    fn test_polymorphic_id_with_sibling_type_field() {
        let registry = registry();
        let normalized = object(json!({"id": 1, "subject": 3, "subjectType": "photo"}));

        let record = Record::from_normalized(&registry, "post", &normalized, &TetherConfig::default()).unwrap();

        assert_eq!(record.relation("subject"), &Relation::Entity(EntityRef::new("photo", 3)));
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn test_untagged_embedded_subject_uses_sibling_type_field() {
        let registry = registry();
        let normalized = object(json!({"id": 1, "subject": {"id": 3}, "subjectType": "photo"}));

        let record = Record::from_normalized(&registry, "post", &normalized, &TetherConfig::default()).unwrap();

        assert_eq!(record.relation("subject"), &Relation::Entity(EntityRef::new("photo", 3)));
    }

    #[test]
    fn test_embedded_tag_wins_over_sibling_type_field() {
        let registry = registry();
        let normalized = object(json!({"id": 1, "subject": {"type": "user", "id": 3}, "subjectType": "photo"}));

        let record = Record::from_normalized(&registry, "post", &normalized, &TetherConfig::default()).unwrap();

        assert_eq!(record.relation("subject"), &Relation::Entity(EntityRef::new("user", 3)));
    }

    #[test]
    fn test_null_and_missing_relations_are_unset() {
        let registry = registry();
        let normalized = object(json!({"id": 1, "author": null}));

        let record = Record::from_normalized(&registry, "post", &normalized, &TetherConfig::default()).unwrap();

        assert_eq!(record.relation("author"), &Relation::Unset);
        assert_eq!(record.relation("tags"), &Relation::Unset);
    }

    #[test]
    fn test_unknown_type() {
        let registry = registry();
        let result = Record::from_normalized(&registry, "ghost", &Map::new(), &TetherConfig::default());
        assert!(matches!(result, Err(Error::UnknownType(_))));
    }
}
