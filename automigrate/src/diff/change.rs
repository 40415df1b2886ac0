use crate::schema::{CollectionDefinition, CollectionKind, Options, RuleKind, SchemaField};
use std::fmt::{Display, Formatter};

/// One atomic, independently reversible structural change between two
/// versions of a collection.
///
/// Every variant carries the full data needed to render it and to build its
/// inverse, so a change list never has to consult the definitions it was
/// computed from.
///
/// Positions are indexes into the field or index list of the definition the
/// change produces (`position`, `new_position`) or consumes
/// (`old_position`, and `position` of removals).
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateCollection(CollectionDefinition),
    DeleteCollection(CollectionDefinition),
    RenameCollection {
        old_name: String,
        new_name: String,
    },
    ChangeKind {
        old: CollectionKind,
        new: CollectionKind,
    },
    AddField {
        field: SchemaField,
        position: usize,
    },
    RemoveField {
        field: SchemaField,
        position: usize,
    },
    AlterField {
        old: SchemaField,
        new: SchemaField,
        old_position: usize,
        new_position: usize,
    },
    RenameField {
        old: SchemaField,
        new: SchemaField,
        old_position: usize,
        new_position: usize,
    },
    AddIndex {
        index: String,
        position: usize,
    },
    DropIndex {
        index: String,
        position: usize,
    },
    ChangeRule {
        rule: RuleKind,
        old: Option<String>,
        new: Option<String>,
    },
    ChangeOptions {
        old: Options,
        new: Options,
    },
}

impl SchemaChange {
    /// Returns the change that undoes `self`.
    pub fn invert(&self) -> SchemaChange {
        match self {
            SchemaChange::CreateCollection(definition) => {
                SchemaChange::DeleteCollection(definition.clone())
            }
            SchemaChange::DeleteCollection(definition) => {
                SchemaChange::CreateCollection(definition.clone())
            }
            SchemaChange::RenameCollection { old_name, new_name } => {
                SchemaChange::RenameCollection {
                    old_name: new_name.clone(),
                    new_name: old_name.clone(),
                }
            }
            SchemaChange::ChangeKind { old, new } => SchemaChange::ChangeKind {
                old: *new,
                new: *old,
            },
            SchemaChange::AddField { field, position } => SchemaChange::RemoveField {
                field: field.clone(),
                position: *position,
            },
            SchemaChange::RemoveField { field, position } => SchemaChange::AddField {
                field: field.clone(),
                position: *position,
            },
            SchemaChange::AlterField {
                old,
                new,
                old_position,
                new_position,
            } => SchemaChange::AlterField {
                old: new.clone(),
                new: old.clone(),
                old_position: *new_position,
                new_position: *old_position,
            },
            SchemaChange::RenameField {
                old,
                new,
                old_position,
                new_position,
            } => SchemaChange::RenameField {
                old: new.clone(),
                new: old.clone(),
                old_position: *new_position,
                new_position: *old_position,
            },
            SchemaChange::AddIndex { index, position } => SchemaChange::DropIndex {
                index: index.clone(),
                position: *position,
            },
            SchemaChange::DropIndex { index, position } => SchemaChange::AddIndex {
                index: index.clone(),
                position: *position,
            },
            SchemaChange::ChangeRule { rule, old, new } => SchemaChange::ChangeRule {
                rule: *rule,
                old: new.clone(),
                new: old.clone(),
            },
            SchemaChange::ChangeOptions { old, new } => SchemaChange::ChangeOptions {
                old: new.clone(),
                new: old.clone(),
            },
        }
    }

    /// Canonical `(phase, position)` ordering key.
    ///
    /// Index drops run before field removals and index additions after field
    /// additions, so an index never refers to a field that does not exist at
    /// that point of the script.
    pub(crate) fn sort_key(&self) -> (u8, usize) {
        match self {
            SchemaChange::CreateCollection(_) | SchemaChange::DeleteCollection(_) => (0, 0),
            SchemaChange::RenameCollection { .. } => (0, 1),
            SchemaChange::ChangeKind { .. } => (0, 2),
            SchemaChange::DropIndex { position, .. } => (1, *position),
            SchemaChange::RemoveField { position, .. } => (2, *position),
            SchemaChange::AlterField { new_position, .. }
            | SchemaChange::RenameField { new_position, .. } => (3, *new_position),
            SchemaChange::AddField { position, .. } => (4, *position),
            SchemaChange::AddIndex { position, .. } => (5, *position),
            SchemaChange::ChangeRule { rule, .. } => (6, rule.ordinal()),
            SchemaChange::ChangeOptions { .. } => (7, 0),
        }
    }

    /// Returns `true` for the whole-collection variants.
    pub fn is_collection_level(&self) -> bool {
        matches!(
            self,
            SchemaChange::CreateCollection(_) | SchemaChange::DeleteCollection(_)
        )
    }
}

impl Display for SchemaChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaChange::CreateCollection(definition) => {
                write!(f, "create collection {}", definition.name())
            }
            SchemaChange::DeleteCollection(definition) => {
                write!(f, "delete collection {}", definition.name())
            }
            SchemaChange::RenameCollection { old_name, new_name } => {
                write!(f, "rename collection {} to {}", old_name, new_name)
            }
            SchemaChange::ChangeKind { old, new } => {
                write!(f, "change collection type {} to {}", old, new)
            }
            SchemaChange::AddField { field, .. } => write!(f, "add field {}", field.name()),
            SchemaChange::RemoveField { field, .. } => write!(f, "remove field {}", field.name()),
            SchemaChange::AlterField { new, .. } => write!(f, "update field {}", new.name()),
            SchemaChange::RenameField { old, new, .. } => {
                write!(f, "rename field {} to {}", old.name(), new.name())
            }
            SchemaChange::AddIndex { index, .. } => write!(f, "add index {}", index),
            SchemaChange::DropIndex { index, .. } => write!(f, "drop index {}", index),
            SchemaChange::ChangeRule { rule, .. } => write!(f, "update {}", rule),
            SchemaChange::ChangeOptions { .. } => write!(f, "update options"),
        }
    }
}

/// What happened to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
        }
    }
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `(old, new, action)` triple describing one processed mutation.
///
/// At most one side is absent; a record cannot be built from two absent
/// sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    old: Option<CollectionDefinition>,
    new: Option<CollectionDefinition>,
    action: ChangeAction,
}

impl ChangeRecord {
    /// Builds a record, deriving the action from which sides are present.
    ///
    /// Returns `None` when both sides are absent.
    pub fn new(
        old: Option<CollectionDefinition>,
        new: Option<CollectionDefinition>,
    ) -> Option<ChangeRecord> {
        let action = match (&old, &new) {
            (None, None) => return None,
            (None, Some(_)) => ChangeAction::Created,
            (Some(_), None) => ChangeAction::Deleted,
            (Some(_), Some(_)) => ChangeAction::Updated,
        };
        Some(ChangeRecord { old, new, action })
    }

    pub fn old(&self) -> Option<&CollectionDefinition> {
        self.old.as_ref()
    }

    pub fn new_definition(&self) -> Option<&CollectionDefinition> {
        self.new.as_ref()
    }

    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// Id of the collection the record is about.
    pub fn collection_id(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(CollectionDefinition::id)
            .unwrap_or_default()
    }

    /// Human readable label, e.g. `created_posts`.
    ///
    /// Updates and deletions are labelled with the name the collection had
    /// before the change.
    pub fn action_label(&self) -> String {
        let name = match self.action {
            ChangeAction::Created => self.new.as_ref().map(CollectionDefinition::name),
            ChangeAction::Updated | ChangeAction::Deleted => {
                self.old.as_ref().map(CollectionDefinition::name)
            }
        };
        format!("{}_{}", self.action, name.unwrap_or_default())
    }
}
