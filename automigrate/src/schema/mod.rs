//! Collection schema data model.
//!
//! A [`CollectionDefinition`] is a full value snapshot of one collection as
//! the schema store reported it: ordered fields, access rules, indexes and
//! free-form options. Definitions are never live references; every
//! observation is an independent clone.

mod collection;
mod field;
mod rules;

pub use collection::*;
pub use field::*;
pub use rules::*;

/// Ordered, free-form option map attached to fields and collections.
pub type Options = indexmap::IndexMap<String, serde_json::Value>;
