use crate::error::{Error, Result};
use crate::inbound::RelationshipExtractor;
use crate::outbound;
use crate::pagination::{self, PaginationMetadata};
use crate::record::Record;
use crate::registry::TypeRegistry;
use crate::store::GraphStore;
use crate::types::{EntityId, TetherConfig};
use serde_json::{Map, Value};
use tracing::debug;

/// Converts between wire payloads and the flat records of a graph store
///
/// ```rust
/// use tether::{MemoryStore, PayloadSerializer, RelationshipDescriptor, SchemaRegistry, TetherConfig, TypeDescriptor};
/// use serde_json::json;
///
/// # fn main() -> tether::Result<()> {
/// let registry = SchemaRegistry::new()
///     .with_type(TypeDescriptor::new("post").with_relationship(RelationshipDescriptor::reference("author", "user")))
///     .with_type(TypeDescriptor::new("user"));
/// let mut store = MemoryStore::new(&registry);
/// let serializer = PayloadSerializer::new(registry, TetherConfig::default());
///
/// let post = serializer.normalize_single(
///     &mut store,
///     "post",
///     json!({"id": 1, "author": {"id": 5, "name": "Ada"}}),
/// )?;
///
/// assert_eq!(post["author"], json!(5));
/// assert_eq!(store.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct PayloadSerializer<R: TypeRegistry> {
    registry: R,
    config: TetherConfig,
}

impl<R: TypeRegistry> PayloadSerializer<R> {
    pub fn new(registry: R, config: TetherConfig) -> Self {
        PayloadSerializer { registry, config }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// Normalize one entity payload. Embedded related entities are upserted
    /// into `store`; the root record itself is only returned.
    pub fn normalize_single<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        type_name: &str,
        payload: Value,
    ) -> Result<Map<String, Value>> {
        let type_name = store.resolve_type(type_name)?;
        let Value::Object(payload) = payload else {
            return Err(Error::NotAnObject { type_name });
        };

        RelationshipExtractor::new(&self.registry, &self.config)
            .extract(&type_name, payload)?
            .apply(store)
    }

    /// Normalize a list of entity payloads. A paginated envelope is
    /// unwrapped to its `results`.
    pub fn normalize_collection<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        type_name: &str,
        payload: Value,
    ) -> Result<Vec<Map<String, Value>>> {
        let payloads = match payload {
            Value::Array(payloads) => payloads,
            mut envelope if pagination::is_envelope(&envelope) => {
                match envelope.get_mut("results").map(Value::take) {
                    Some(Value::Array(results)) => results,
                    _ => Vec::new(),
                }
            }
            _ => {
                return Err(Error::NotAnObject {
                    type_name: type_name.to_string(),
                })
            }
        };

        debug!(type_name, len = payloads.len(), "normalizing collection");
        payloads
            .into_iter()
            .map(|payload| self.normalize_single(store, type_name, payload))
            .collect()
    }

    /// Normalize one payload and upsert the resulting record too
    pub fn push_single<S: GraphStore + ?Sized>(&self, store: &mut S, type_name: &str, payload: Value) -> Result<EntityId> {
        let record = self.normalize_single(store, type_name, payload)?;
        let type_name = store.resolve_type(type_name)?;
        store.upsert_one(&type_name, record)
    }

    /// Normalize a list (or envelope) of payloads and upsert every record
    pub fn push_many<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        type_name: &str,
        payload: Value,
    ) -> Result<Vec<EntityId>> {
        let records = self.normalize_collection(store, type_name, payload)?;
        let type_name = store.resolve_type(type_name)?;
        store.upsert_many(&type_name, records)
    }

    pub fn infer_pagination_metadata(&self, envelope: &Value) -> Option<PaginationMetadata> {
        pagination::infer_pagination_metadata(envelope)
    }

    /// Infer pagination metadata for a query on `type_name` and record it on the store
    pub fn extract_meta<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        type_name: &str,
        envelope: &Value,
    ) -> Result<Option<PaginationMetadata>> {
        let Some(meta) = pagination::infer_pagination_metadata(envelope) else {
            return Ok(None);
        };
        let type_name = store.resolve_type(type_name)?;
        store.record_meta(&type_name, meta.clone());
        Ok(Some(meta))
    }

    /// Build the outbound record for a normalized `type_name` record
    pub fn materialize(&self, type_name: &str, normalized: &Map<String, Value>) -> Result<Record> {
        Record::from_normalized(&self.registry, type_name, normalized, &self.config)
    }

    /// Wire form of `record`
    pub fn serialize_record(&self, record: &Record) -> Result<Map<String, Value>> {
        let descriptor = self
            .registry
            .resolve_type(&record.type_name)
            .ok_or_else(|| Error::UnknownType(record.type_name.clone()))?;
        outbound::serialize_record(descriptor, record, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Inverse, RelationshipDescriptor, SchemaRegistry, TypeDescriptor};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_type(
                TypeDescriptor::new("post")
                    .with_attribute("title")
                    .with_read_only_attribute("created_at")
                    .with_relationship(RelationshipDescriptor::reference("author", "user"))
                    .with_relationship(RelationshipDescriptor::collection("tags", "tag", Inverse::Many))
                    .with_relationship(RelationshipDescriptor::polymorphic_reference("subject", "subject")),
            )
            .with_type(TypeDescriptor::new("user"))
            .with_type(TypeDescriptor::new("tag").with_primary_key("slug"))
            .with_type(TypeDescriptor::new("photo"))
            .with_type(TypeDescriptor::new("evil_minion"))
    }

    fn setup() -> (PayloadSerializer<SchemaRegistry>, MemoryStore) {
        let registry = registry();
        let store = MemoryStore::new(&registry);
        (PayloadSerializer::new(registry, TetherConfig::default()), store)
    }

    fn relationship_fields(json: &Map<String, Value>) -> Vec<(String, Value)> {
        ["author", "tags", "subject", "subject_type"]
            .iter()
            .map(|key| (key.to_string(), json.get(*key).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    #[test]
    fn test_round_trip_reproduces_relationship_ids() {
        let (serializer, mut store) = setup();
        let wire = json!({
            "id": 1,
            "title": "Hello",
            "author": 5,
            "tags": ["rust", "json"],
            "subject": 3,
            "subject_type": "photo"
        });

        let normalized = serializer.normalize_single(&mut store, "post", wire.clone()).unwrap();
        let record = serializer.materialize("post", &normalized).unwrap();
        let back = serializer.serialize_record(&record).unwrap();

        let wire: Map<String, Value> = serde_json::from_value(wire).unwrap();
        assert_eq!(relationship_fields(&back), relationship_fields(&wire));
        assert_eq!(back["title"], "Hello");
    }

    #[test]
    fn test_round_trip_from_embedded_data() {
        let (serializer, mut store) = setup();
        let wire = json!({
            "id": 1,
            "author": {"id": 5, "name": "Ada"},
            "tags": [{"slug": "rust"}, {"slug": "json"}],
            "subject": {"type": "EvilMinion", "id": 9}
        });

        let normalized = serializer.normalize_single(&mut store, "post", wire).unwrap();
        let record = serializer.materialize("post", &normalized).unwrap();
        let back = serializer.serialize_record(&record).unwrap();

        assert_eq!(back["author"], json!(5));
        assert_eq!(back["tags"], json!(["rust", "json"]));
        assert_eq!(back["subject"], json!(9));
        assert_eq!(back["subject_type"], json!("evil_minion"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_normalize_collection_unwraps_envelope() {
        let (serializer, mut store) = setup();
        let envelope = json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [
                {"id": 1, "author": {"id": 5}},
                {"id": 2, "author": {"id": 6}}
            ]
        });

        let records = serializer.normalize_collection(&mut store, "post", envelope).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["author"], json!(6));
        assert_eq!(store.all("user").count(), 2);
    }

    #[test]
    fn test_normalize_single_rejects_non_objects() {
        let (serializer, mut store) = setup();
        assert!(matches!(
            serializer.normalize_single(&mut store, "post", json!([1, 2])),
            Err(Error::NotAnObject { .. })
        ));
        assert!(matches!(
            serializer.normalize_single(&mut store, "ghost", json!({})),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_push_many_stores_roots() {
        let (serializer, mut store) = setup();
        let ids = serializer
            .push_many(&mut store, "post", json!([{"id": 1, "author": {"id": 5}}, {"id": 2}]))
            .unwrap();

        assert_eq!(ids, vec![EntityId::Int(1), EntityId::Int(2)]);
        assert_eq!(store.get("post", &EntityId::Int(1)).unwrap()["author"], json!(5));
    }

    #[test]
    fn test_extract_meta_records_on_store() {
        let (serializer, mut store) = setup();
        let envelope = json!({"count": 25, "results": [{"id": 1}], "next": "/posts/?page=2", "previous": null});

        let meta = serializer.extract_meta(&mut store, "post", &envelope).unwrap().unwrap();

        assert_eq!(store.meta_for_type("post"), Some(&meta));
        assert_eq!(serializer.extract_meta(&mut store, "post", &json!([])).unwrap(), None);
    }
}
