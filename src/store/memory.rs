//! In-memory graph store.
//!
//! A plain identity map: no change tracking, no relationship bookkeeping.
//! Upserting an id that is already present merges the new fields over the
//! old ones.

use super::GraphStore;
use crate::error::{Error, Result};
use crate::inflect::underscore;
use crate::pagination::PaginationMetadata;
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::types::{EntityId, EntityRef};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// `(type, id) -> record` map backed by the types of a schema registry
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// type name -> primary-key field
    primary_keys: HashMap<String, String>,
    records: HashMap<String, BTreeMap<EntityId, Map<String, Value>>>,
    meta: HashMap<String, PaginationMetadata>,
}

impl MemoryStore {
    pub fn new<R: TypeRegistry + ?Sized>(registry: &R) -> Self {
        Self::from_descriptors(registry.descriptors())
    }

    pub fn from_descriptors<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a TypeDescriptor>,
    {
        let primary_keys = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), d.primary_key.clone()))
            .collect();

        MemoryStore {
            primary_keys,
            records: HashMap::new(),
            meta: HashMap::new(),
        }
    }

    pub fn get(&self, type_name: &str, id: &EntityId) -> Option<&Map<String, Value>> {
        self.records.get(type_name)?.get(id)
    }

    pub fn get_ref(&self, entity: &EntityRef) -> Option<&Map<String, Value>> {
        self.get(&entity.type_name, &entity.id)
    }

    /// All records of one type, ordered by id
    pub fn all(&self, type_name: &str) -> impl Iterator<Item = (&EntityId, &Map<String, Value>)> {
        self.records.get(type_name).into_iter().flat_map(|records| records.iter())
    }

    /// Every record in the store as `(type, id, record)`
    pub fn entities(&self) -> impl Iterator<Item = (&str, &EntityId, &Map<String, Value>)> {
        self.records.iter().flat_map(|(type_name, records)| {
            records.iter().map(move |(id, record)| (type_name.as_str(), id, record))
        })
    }

    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn meta_for_type(&self, type_name: &str) -> Option<&PaginationMetadata> {
        self.meta.get(type_name)
    }
}

impl GraphStore for MemoryStore {
    fn upsert_one(&mut self, type_name: &str, record: Map<String, Value>) -> Result<EntityId> {
        let type_name = self.resolve_type(type_name)?;
        let pk = &self.primary_keys[&type_name];

        let id = record
            .get(pk)
            .and_then(EntityId::from_value)
            .ok_or_else(|| Error::MissingIdentifier {
                type_name: type_name.clone(),
                field: pk.clone(),
            })?;

        debug!(type_name = %type_name, id = %id, "upsert");

        let slot = self
            .records
            .entry(type_name)
            .or_default()
            .entry(id.clone())
            .or_default();
        slot.extend(record);

        Ok(id)
    }

    fn resolve_type(&self, name: &str) -> Result<String> {
        if self.primary_keys.contains_key(name) {
            return Ok(name.to_string());
        }
        let underscored = underscore(name);
        if self.primary_keys.contains_key(&underscored) {
            return Ok(underscored);
        }
        Err(Error::UnknownType(name.to_string()))
    }

    fn record_meta(&mut self, type_name: &str, meta: PaginationMetadata) {
        self.meta.insert(type_name.to_string(), meta);
    }
}
