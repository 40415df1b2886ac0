//! Semantic diff between two versions of a collection.
//!
//! [`diff`] turns an `(old, new)` pair of optional definitions into an
//! ordered list of [`SchemaChange`]s, [`invert`] produces the list that
//! undoes it and [`apply`] replays a list on a definition.
//!
//! # Canonical order
//!
//! Change lists are always sorted by phase, then by position:
//!
//! 1. collection rename and type change
//! 2. index drops (old order)
//! 3. field removals (old order)
//! 4. field renames and alterations (new order)
//! 5. field additions (new order)
//! 6. index additions (new order)
//! 7. rule changes (list, view, create, update, delete)
//! 8. option changes

mod apply;
mod change;
mod engine;
#[cfg(test)]
mod laws;

pub use apply::apply;
pub use change::*;
pub use engine::{diff, invert};

/// The changes of one [`ChangeRecord`], ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    collection_id: String,
    action: ChangeAction,
    up: Vec<SchemaChange>,
}

impl ChangeSet {
    /// Diffs the two sides of `record`.
    pub fn from_record(record: &ChangeRecord) -> ChangeSet {
        ChangeSet {
            collection_id: record.collection_id().to_string(),
            action: record.action(),
            up: diff(record.old(), record.new_definition()),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// Changes reconstructing the new state from the old one.
    pub fn up(&self) -> &[SchemaChange] {
        &self.up
    }

    /// Changes reconstructing the old state from the new one.
    pub fn down(&self) -> Vec<SchemaChange> {
        invert(&self.up)
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty()
    }
}
