//! Entity graph store
//!
//! The store owns every normalized record, keyed by `(type, id)`. The
//! inbound path never writes to it directly: extraction produces a list of
//! `Upsert`s that are applied afterwards, in order.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::pagination::PaginationMetadata;
use crate::types::EntityId;
use serde_json::{Map, Value};

/// Storage contract consumed by the normalizer
pub trait GraphStore {
    /// Insert or update one record. Repeated upserts of the same id are
    /// allowed; the last write wins.
    fn upsert_one(&mut self, type_name: &str, record: Map<String, Value>) -> Result<EntityId>;

    /// Insert or update a batch of records of one type
    fn upsert_many(&mut self, type_name: &str, records: Vec<Map<String, Value>>) -> Result<Vec<EntityId>> {
        records
            .into_iter()
            .map(|record| self.upsert_one(type_name, record))
            .collect()
    }

    /// Map a type name as used by callers to the store's canonical type name
    fn resolve_type(&self, name: &str) -> Result<String>;

    /// Remember the pagination metadata of the latest query for a type
    fn record_meta(&mut self, _type_name: &str, _meta: PaginationMetadata) {}
}

/// A write the extractor wants applied to the graph store
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    One {
        type_name: String,
        record: Map<String, Value>,
    },
    Many {
        type_name: String,
        records: Vec<Map<String, Value>>,
    },
}

impl Upsert {
    pub fn type_name(&self) -> &str {
        match self {
            Upsert::One { type_name, .. } | Upsert::Many { type_name, .. } => type_name,
        }
    }

    /// Number of records this upsert writes
    pub fn len(&self) -> usize {
        match self {
            Upsert::One { .. } => 1,
            Upsert::Many { records, .. } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn apply<S: GraphStore + ?Sized>(self, store: &mut S) -> Result<()> {
        match self {
            Upsert::One { type_name, record } => {
                store.upsert_one(&type_name, record)?;
            }
            Upsert::Many { type_name, records } => {
                store.upsert_many(&type_name, records)?;
            }
        }
        Ok(())
    }
}
