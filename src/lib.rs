//! # Tether - REST payloads <-> normalized entity graphs
//!
//! Reconciles the JSON a REST-style backend sends (related entities embedded
//! inline, polymorphic type tags, paginated envelopes) with the flat,
//! foreign-key based records a client-side data layer keeps.
//!
//! ## Modules
//!
//! - **inbound**: fold embedded related entities into graph-store upserts
//! - **pagination**: infer page metadata from `count`/`next`/`previous` envelopes
//! - **outbound**: turn records back into wire payloads
//! - **registry** / **store**: the type descriptors and entity graph the
//!   transforms work against
//!
//! ## Quick Start
//!
//! ```rust
//! use tether::{MemoryStore, PayloadSerializer, SchemaRegistry, TetherConfig};
//! use serde_json::json;
//!
//! # fn main() -> tether::Result<()> {
//! let registry = SchemaRegistry::from_json(r#"{"types": [
//!     {"name": "post", "relationships": [
//!         {"key": "comments", "kind": "collection", "target": "comment"}
//!     ]},
//!     {"name": "comment"}
//! ]}"#)?;
//! let mut store = MemoryStore::new(&registry);
//! let serializer = PayloadSerializer::new(registry, TetherConfig::default());
//!
//! let post = serializer.normalize_single(&mut store, "post", json!({
//!     "id": 1,
//!     "comments": [{"id": 10, "body": "First"}, {"id": 11, "body": "Second"}]
//! }))?;
//!
//! // comments replaced by their ids, each comment now lives in the store
//! assert_eq!(post["comments"], json!([10, 11]));
//! assert_eq!(store.all("comment").count(), 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result as AnyResult};
use serde_json::{Map, Value};
use std::io::BufRead;

pub mod error;
pub mod inbound;
pub mod inflect;
pub mod outbound;
pub mod pagination;
pub mod record;
pub mod registry;
pub mod serializer;
pub mod store;
pub mod types;
pub mod writer;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use inbound::{Extraction, RelationshipExtractor};
pub use pagination::{infer_pagination_metadata, is_envelope, PaginationMetadata};
pub use record::{Record, Relation};
pub use registry::{Inverse, RelationshipDescriptor, RelationshipKind, SchemaRegistry, TypeDescriptor, TypeRegistry};
pub use serializer::PayloadSerializer;
pub use store::{GraphStore, MemoryStore, Upsert};
pub use types::{EntityId, EntityRef, TetherConfig};

/// Normalize a stream of newline-delimited payloads of one type into `store`
///
/// Each line holds a single entity, an array of entities or a paginated
/// envelope. Returns the flat records in input order; pagination metadata
/// of envelopes is recorded on the store.
pub fn normalize_json<R, T, S>(
    reader: R,
    serializer: &PayloadSerializer<T>,
    store: &mut S,
    type_name: &str,
) -> AnyResult<Vec<Map<String, Value>>>
where
    R: BufRead,
    T: TypeRegistry,
    S: GraphStore + ?Sized,
{
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .context("Failed to parse JSON")?;

        serializer.extract_meta(store, type_name, &value)?;
        if value.is_object() && !is_envelope(&value) {
            records.push(serializer.normalize_single(store, type_name, value)?);
        } else {
            records.extend(serializer.normalize_collection(store, type_name, value)?);
        }
    }

    Ok(records)
}
