//! Inbound normalization - wire payloads into flat records
//!
//! A payload goes through two steps:
//!
//! 1. `type_keys` rewrites polymorphic type tags into their canonical fields
//! 2. `extractor` folds embedded related entities into graph-store upserts
//!    and leaves foreign keys in their place
//!
//! Extraction is a pure transform. Nothing touches the graph store until
//! `Extraction::apply` is called.

pub mod extractor;
pub mod type_keys;

pub use extractor::{Extraction, RelationshipExtractor};
pub use type_keys::normalize_type_keys;
