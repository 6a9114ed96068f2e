use serde::{Deserialize, Serialize};

/// Cardinality of the far side of a collection relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inverse {
    /// many-to-none
    #[default]
    None,
    /// many-to-one; the other side owns the link
    One,
    /// many-to-many
    Many,
}

/// How a relationship relates its owner to the target type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipKind {
    Reference {
        target: String,
    },
    PolymorphicReference {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        embedded_type_key: Option<String>,
    },
    Collection {
        target: String,
        #[serde(default)]
        inverse: Inverse,
    },
    PolymorphicCollection {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        embedded_type_key: Option<String>,
        #[serde(default)]
        inverse: Inverse,
    },
}

/// One relationship of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Field name of the relationship in payloads and records
    pub key: String,

    #[serde(flatten)]
    pub kind: RelationshipKind,

    /// Never sent back to the server
    #[serde(default)]
    pub read_only: bool,
}

impl RelationshipDescriptor {
    pub fn new(key: impl Into<String>, kind: RelationshipKind) -> Self {
        RelationshipDescriptor {
            key: key.into(),
            kind,
            read_only: false,
        }
    }

    pub fn reference(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(key, RelationshipKind::Reference { target: target.into() })
    }

    pub fn polymorphic_reference(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            key,
            RelationshipKind::PolymorphicReference {
                target: target.into(),
                embedded_type_key: None,
            },
        )
    }

    pub fn collection(key: impl Into<String>, target: impl Into<String>, inverse: Inverse) -> Self {
        Self::new(
            key,
            RelationshipKind::Collection {
                target: target.into(),
                inverse,
            },
        )
    }

    pub fn polymorphic_collection(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            key,
            RelationshipKind::PolymorphicCollection {
                target: target.into(),
                embedded_type_key: None,
                inverse: Inverse::None,
            },
        )
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Override the field holding the type tag inside embedded data.
    /// Ignored for non-polymorphic relationships.
    pub fn with_embedded_type_key(mut self, key: impl Into<String>) -> Self {
        match &mut self.kind {
            RelationshipKind::PolymorphicReference { embedded_type_key, .. }
            | RelationshipKind::PolymorphicCollection { embedded_type_key, .. } => {
                *embedded_type_key = Some(key.into());
            }
            RelationshipKind::Reference { .. } | RelationshipKind::Collection { .. } => {}
        }
        self
    }

    /// The declared target type
    pub fn target(&self) -> &str {
        match &self.kind {
            RelationshipKind::Reference { target }
            | RelationshipKind::PolymorphicReference { target, .. }
            | RelationshipKind::Collection { target, .. }
            | RelationshipKind::PolymorphicCollection { target, .. } => target,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(
            self.kind,
            RelationshipKind::PolymorphicReference { .. } | RelationshipKind::PolymorphicCollection { .. }
        )
    }

    pub fn embedded_type_key(&self) -> Option<&str> {
        match &self.kind {
            RelationshipKind::PolymorphicReference { embedded_type_key, .. }
            | RelationshipKind::PolymorphicCollection { embedded_type_key, .. } => embedded_type_key.as_deref(),
            RelationshipKind::Reference { .. } | RelationshipKind::Collection { .. } => None,
        }
    }
}

/// A plain (non-relationship) field of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Everything the registry knows about one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,

    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
}

fn default_primary_key() -> String {
    String::from("id")
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            primary_key: default_primary_key(),
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.into(),
            read_only: false,
        });
        self
    }

    pub fn with_read_only_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.into(),
            read_only: true,
        });
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn is_read_only_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name && a.read_only)
    }

    pub fn relationship(&self, key: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_from_json() {
        let descriptor: TypeDescriptor = serde_json::from_value(json!({
            "name": "post",
            "attributes": [{"name": "title"}, {"name": "created", "read_only": true}],
            "relationships": [
                {"key": "author", "kind": "reference", "target": "user"},
                {"key": "subject", "kind": "polymorphic_reference", "target": "taggable", "embedded_type_key": "kind"},
                {"key": "comments", "kind": "collection", "target": "comment", "inverse": "one"}
            ]
        }))
        .unwrap();

        assert_eq!(descriptor.primary_key, "id");
        assert!(descriptor.is_read_only_attribute("created"));
        assert!(!descriptor.is_read_only_attribute("title"));

        let subject = descriptor.relationship("subject").unwrap();
        assert!(subject.is_polymorphic());
        assert_eq!(subject.embedded_type_key(), Some("kind"));
        assert_eq!(subject.target(), "taggable");

        let comments = descriptor.relationship("comments").unwrap();
        assert_eq!(
            comments.kind,
            RelationshipKind::Collection {
                target: "comment".to_string(),
                inverse: Inverse::One
            }
        );
    }

    #[test]
    fn test_embedded_type_key_ignored_on_monomorphic() {
        let rel = RelationshipDescriptor::reference("author", "user").with_embedded_type_key("kind");
        assert_eq!(rel.embedded_type_key(), None);
    }
}
