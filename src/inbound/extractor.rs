use crate::error::{Error, Result};
use crate::inbound::type_keys::normalize_type_keys;
use crate::registry::{RelationshipDescriptor, RelationshipKind, TypeRegistry};
use crate::store::{GraphStore, Upsert};
use crate::types::{TetherConfig, CANONICAL_TYPE_KEY};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Result of extracting one payload: the flat record plus the writes that
/// fold its embedded entities into the graph store
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: Map<String, Value>,

    /// Nested entities come before the entities that embed them
    pub upserts: Vec<Upsert>,
}

impl Extraction {
    /// Apply every upsert to `store` and hand back the flat record
    pub fn apply<S: GraphStore + ?Sized>(self, store: &mut S) -> Result<Map<String, Value>> {
        for upsert in self.upserts {
            upsert.apply(store)?;
        }
        Ok(self.record)
    }
}

/// Walks a type's relationship descriptors over a raw payload and flattens
/// embedded related entities into foreign keys
pub struct RelationshipExtractor<'a, R: TypeRegistry + ?Sized> {
    registry: &'a R,
    config: &'a TetherConfig,
}

impl<'a, R: TypeRegistry + ?Sized> RelationshipExtractor<'a, R> {
    pub fn new(registry: &'a R, config: &'a TetherConfig) -> Self {
        RelationshipExtractor { registry, config }
    }

    /// Extract the relationships of a `type_name` payload
    pub fn extract(&self, type_name: &str, payload: Map<String, Value>) -> Result<Extraction> {
        let mut upserts = Vec::new();
        let record = self.extract_entity(type_name, payload, 0, &mut upserts)?;
        Ok(Extraction { record, upserts })
    }

    /// Recursively normalize one entity payload
    fn extract_entity(
        &self,
        type_name: &str,
        mut payload: Map<String, Value>,
        depth: usize,
        upserts: &mut Vec<Upsert>,
    ) -> Result<Map<String, Value>> {
        let relationships = self.registry.relationships_of(type_name);
        normalize_type_keys(relationships, &mut payload, self.config);

        if depth > self.config.max_depth {
            if relationships.iter().any(|r| payload.get(&r.key).is_some_and(is_embedded)) {
                warn!(type_name, depth, "max depth reached, leaving embedded data in place");
            }
            return Ok(payload);
        }

        for relationship in relationships {
            let Some(slot) = payload.get_mut(&relationship.key) else {
                continue;
            };
            let value = std::mem::take(slot);
            *slot = self.extract_relationship(relationship, value, depth, upserts)?;
        }

        Ok(payload)
    }

    /// Returns the value the relationship field holds after extraction
    fn extract_relationship(
        &self,
        relationship: &RelationshipDescriptor,
        value: Value,
        depth: usize,
        upserts: &mut Vec<Upsert>,
    ) -> Result<Value> {
        match (&relationship.kind, value) {
            (RelationshipKind::Reference { target }, Value::Object(obj)) => {
                debug!(key = %relationship.key, target = %target, "embedded reference");
                let record = self.extract_entity(target, obj, depth + 1, upserts)?;
                let id = identifier(&record, self.registry.primary_key_of(target));
                upserts.push(Upsert::One {
                    type_name: target.clone(),
                    record,
                });
                Ok(id)
            }
            (RelationshipKind::PolymorphicReference { target, .. }, Value::Object(obj)) => {
                let type_name = self.resolve_tagged(&obj, target)?;
                debug!(key = %relationship.key, type_name = %type_name, "embedded polymorphic reference");
                let record = self.extract_entity(&type_name, obj, depth + 1, upserts)?;
                upserts.push(Upsert::One {
                    type_name,
                    record: record.clone(),
                });
                Ok(Value::Object(record))
            }
            (RelationshipKind::Collection { target, .. }, Value::Array(elements))
                if is_embedded_array(&elements) =>
            {
                debug!(key = %relationship.key, target = %target, len = elements.len(), "embedded collection");
                let pk = self.registry.primary_key_of(target);
                let mut ids = Vec::with_capacity(elements.len());
                let mut records = Vec::with_capacity(elements.len());

                for element in elements {
                    match element {
                        Value::Object(obj) => {
                            let record = self.extract_entity(target, obj, depth + 1, upserts)?;
                            ids.push(identifier(&record, pk));
                            records.push(record);
                        }
                        // Already a reference
                        other => ids.push(other),
                    }
                }

                upserts.push(Upsert::Many {
                    type_name: target.clone(),
                    records,
                });
                Ok(Value::Array(ids))
            }
            (RelationshipKind::PolymorphicCollection { target, .. }, Value::Array(elements))
                if is_embedded_array(&elements) =>
            {
                debug!(key = %relationship.key, len = elements.len(), "embedded polymorphic collection");
                let mut normalized = Vec::with_capacity(elements.len());

                // Elements may be of different types, so each gets its own upsert
                for element in elements {
                    match element {
                        Value::Object(obj) => {
                            let type_name = self.resolve_tagged(&obj, target)?;
                            let record = self.extract_entity(&type_name, obj, depth + 1, upserts)?;
                            upserts.push(Upsert::One {
                                type_name,
                                record: record.clone(),
                            });
                            normalized.push(Value::Object(record));
                        }
                        other => normalized.push(other),
                    }
                }

                Ok(Value::Array(normalized))
            }
            (_, value) => Ok(value),
        }
    }

    /// Concrete type of embedded polymorphic data, read from its own `type`
    /// tag. Untagged data falls back to the declared target type.
    fn resolve_tagged(&self, obj: &Map<String, Value>, declared: &str) -> Result<String> {
        match obj.get(CANONICAL_TYPE_KEY).and_then(Value::as_str) {
            Some(tag) => self
                .registry
                .resolve_type(tag)
                .map(|descriptor| descriptor.name.clone())
                .ok_or_else(|| Error::UnknownType(tag.to_string())),
            None => Ok(declared.to_string()),
        }
    }
}

/// A non-empty array whose first element is an object holds embedded entities
fn is_embedded_array(elements: &[Value]) -> bool {
    matches!(elements.first(), Some(Value::Object(_)))
}

fn is_embedded(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(elements) => is_embedded_array(elements),
        _ => false,
    }
}

/// Missing ids become `null`; the graph store rejects the record when the upsert is applied
fn identifier(record: &Map<String, Value>, pk: &str) -> Value {
    record.get(pk).cloned().unwrap_or(Value::Null)
}
