//! Type descriptor registry
//!
//! The registry tells the inbound and outbound paths which fields of a type
//! are relationships, what they point at, and which field is the primary
//! key. Hosts with their own schema system implement `TypeRegistry`;
//! `SchemaRegistry` is a ready-made one loaded from a JSON document.

pub mod descriptor;

pub use descriptor::{AttributeDescriptor, Inverse, RelationshipDescriptor, RelationshipKind, TypeDescriptor};

use crate::error::{Error, Result};
use crate::inflect::underscore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

/// Supplies relationship metadata per entity type
pub trait TypeRegistry {
    /// Look up a type by its exact registered name
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor>;

    /// Every registered type
    fn descriptors(&self) -> Box<dyn Iterator<Item = &TypeDescriptor> + '_>;

    fn relationships_of(&self, type_name: &str) -> &[RelationshipDescriptor] {
        self.descriptor(type_name)
            .map(|d| d.relationships.as_slice())
            .unwrap_or(&[])
    }

    /// Primary-key field of `type_name`, `id` for unknown types
    fn primary_key_of(&self, type_name: &str) -> &str {
        self.descriptor(type_name)
            .map(|d| d.primary_key.as_str())
            .unwrap_or("id")
    }

    /// Resolve a wire type tag (`EvilMinion`, `evil-minion`, `evil_minion`) to a registered type
    fn resolve_type(&self, tag: &str) -> Option<&TypeDescriptor> {
        self.descriptor(tag).or_else(|| self.descriptor(&underscore(tag)))
    }
}

/// Wire shape of a schema document: `{"types": [...]}`
#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaDocument {
    types: Vec<TypeDescriptor>,
}

/// In-memory registry of type descriptors
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Load a registry from a schema document
    ///
    /// ```rust
    /// use tether::{SchemaRegistry, TypeRegistry};
    ///
    /// let registry = SchemaRegistry::from_json(r#"{
    ///     "types": [
    ///         {"name": "post", "relationships": [
    ///             {"key": "author", "kind": "reference", "target": "user"}
    ///         ]},
    ///         {"name": "user"}
    ///     ]
    /// }"#).unwrap();
    ///
    /// assert_eq!(registry.relationships_of("post").len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_reader(reader)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: SchemaDocument) -> Self {
        let mut registry = Self::new();
        for descriptor in document.types {
            registry.register(descriptor);
        }
        registry
    }

    /// Like `descriptor`, but an unknown type is an error
    pub fn require(&self, type_name: &str) -> Result<&TypeDescriptor> {
        self.descriptor(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl TypeRegistry for SchemaRegistry {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    fn descriptors(&self) -> Box<dyn Iterator<Item = &TypeDescriptor> + '_> {
        Box::new(self.types.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_type(
                TypeDescriptor::new("post")
                    .with_relationship(RelationshipDescriptor::reference("author", "user")),
            )
            .with_type(TypeDescriptor::new("user").with_primary_key("username"))
            .with_type(TypeDescriptor::new("evil_minion"))
    }

    #[test]
    fn test_relationships_of_unknown_type_is_empty() {
        let registry = registry();
        assert_eq!(registry.relationships_of("post").len(), 1);
        assert!(registry.relationships_of("missing").is_empty());
    }

    #[test]
    fn test_primary_key_of() {
        let registry = registry();
        assert_eq!(registry.primary_key_of("user"), "username");
        assert_eq!(registry.primary_key_of("post"), "id");
        assert_eq!(registry.primary_key_of("missing"), "id");
    }

    #[test]
    fn test_resolve_type_from_tag() {
        let registry = registry();
        assert_eq!(registry.resolve_type("EvilMinion").unwrap().name, "evil_minion");
        assert_eq!(registry.resolve_type("evil_minion").unwrap().name, "evil_minion");
        assert!(registry.resolve_type("GoodMinion").is_none());
    }

    #[test]
    fn test_require_unknown_type() {
        let registry = registry();
        assert!(matches!(registry.require("nope"), Err(Error::UnknownType(name)) if name == "nope"));
    }
}
