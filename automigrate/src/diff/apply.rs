use super::SchemaChange;
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::schema::{CollectionDefinition, SchemaField};

/// Replays `changes` on `definition`.
///
/// This is the in-process counterpart of running a generated script: the
/// up list of `diff(a, b)` applied to `a` yields `b`, and the down list
/// applied to `b` yields `a`. Fields and indexes added at a position past
/// the end are appended.
///
/// # Errors
///
/// Returns `ValidationError` when a change does not fit the definition it
/// is applied to, e.g. removing a field that does not exist or creating a
/// collection that is already present.
pub fn apply(
    definition: Option<CollectionDefinition>,
    changes: &[SchemaChange],
) -> AutomigrateResult<Option<CollectionDefinition>> {
    changes
        .iter()
        .try_fold(definition, |current, change| apply_change(current, change))
}

fn apply_change(
    definition: Option<CollectionDefinition>,
    change: &SchemaChange,
) -> AutomigrateResult<Option<CollectionDefinition>> {
    match change {
        SchemaChange::CreateCollection(created) => match definition {
            None => Ok(Some(created.clone())),
            Some(existing) => Err(invalid(&format!(
                "Cannot create collection {}, {} already exists",
                created.name(),
                existing.name()
            ))),
        },
        SchemaChange::DeleteCollection(deleted) => match definition {
            Some(_) => Ok(None),
            None => Err(invalid(&format!(
                "Cannot delete missing collection {}",
                deleted.name()
            ))),
        },
        other => {
            let mut definition = definition.ok_or_else(|| {
                invalid(&format!("Cannot {} on a missing collection", other))
            })?;
            apply_update(&mut definition, other)?;
            Ok(Some(definition))
        }
    }
}

fn apply_update(definition: &mut CollectionDefinition, change: &SchemaChange) -> AutomigrateResult<()> {
    match change {
        SchemaChange::CreateCollection(_) | SchemaChange::DeleteCollection(_) => {
            return Err(AutomigrateError::new(
                "Collection level change reached field level replay",
                ErrorKind::InternalError,
            ));
        }
        SchemaChange::RenameCollection { old_name, new_name } => {
            if definition.name() != old_name {
                return Err(invalid(&format!(
                    "Cannot rename collection {}, current name is {}",
                    old_name,
                    definition.name()
                )));
            }
            definition.set_name(new_name);
        }
        SchemaChange::ChangeKind { new, .. } => definition.set_kind(*new),
        SchemaChange::AddField { field, position } => {
            if definition.field(field.name()).is_some() {
                return Err(invalid(&format!(
                    "Cannot add field {}, it already exists in {}",
                    field.name(),
                    definition.name()
                )));
            }
            let fields = definition.fields_mut();
            let at = (*position).min(fields.len());
            fields.insert(at, field.clone());
        }
        SchemaChange::RemoveField { field, .. } => {
            let at = find_field(definition, field)?;
            definition.fields_mut().remove(at);
        }
        SchemaChange::AlterField { old, new, .. } | SchemaChange::RenameField { old, new, .. } => {
            let at = find_field(definition, old)?;
            definition.fields_mut()[at] = new.clone();
        }
        SchemaChange::AddIndex { index, position } => {
            let indexes = definition.indexes_mut();
            let at = (*position).min(indexes.len());
            indexes.insert(at, index.clone());
        }
        SchemaChange::DropIndex { index, .. } => {
            let indexes = definition.indexes_mut();
            let at = indexes
                .iter()
                .position(|candidate| candidate == index)
                .ok_or_else(|| invalid(&format!("Cannot drop missing index {}", index)))?;
            indexes.remove(at);
        }
        SchemaChange::ChangeRule { rule, new, .. } => definition.rules_mut().set(*rule, new.clone()),
        SchemaChange::ChangeOptions { new, .. } => definition.set_options(new.clone()),
    }
    Ok(())
}

fn find_field(definition: &CollectionDefinition, field: &SchemaField) -> AutomigrateResult<usize> {
    definition
        .fields()
        .iter()
        .position(|candidate| candidate.same_identity(field))
        .ok_or_else(|| {
            invalid(&format!(
                "Field {} not found in collection {}",
                field.name(),
                definition.name()
            ))
        })
}

fn invalid(message: &str) -> AutomigrateError {
    AutomigrateError::new(message, ErrorKind::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, invert};
    use crate::schema::{FieldType, RuleKind};

    fn posts() -> CollectionDefinition {
        CollectionDefinition::new("pbc_posts", "posts")
            .with_field(SchemaField::new("title", FieldType::Text).with_id("f_title"))
            .with_field(SchemaField::new("views", FieldType::Number))
            .with_index("CREATE INDEX idx_title ON posts (title)")
    }

    fn edited() -> CollectionDefinition {
        CollectionDefinition::new("pbc_posts", "articles")
            .with_field(SchemaField::new("slug", FieldType::Text).with_id("f_slug"))
            .with_field(
                SchemaField::new("headline", FieldType::Text)
                    .with_id("f_title")
                    .with_required(true),
            )
            .with_field(SchemaField::new("views", FieldType::Json))
            .with_rule(RuleKind::Create, Some("@request.auth.id != ''"))
            .with_index("CREATE UNIQUE INDEX idx_slug ON articles (slug)")
            .with_option("viewQuery", "SELECT 1")
    }

    #[test]
    fn test_up_reproduces_new_and_down_reproduces_old() {
        let up = diff(Some(&posts()), Some(&edited()));
        let down = invert(&up);

        assert_eq!(apply(Some(posts()), &up).unwrap(), Some(edited()));
        assert_eq!(apply(Some(edited()), &down).unwrap(), Some(posts()));
    }

    #[test]
    fn test_create_and_delete_round_trip() {
        let up = diff(None, Some(&posts()));
        assert_eq!(apply(None, &up).unwrap(), Some(posts()));
        assert_eq!(apply(Some(posts()), &invert(&up)).unwrap(), None);
    }

    #[test]
    fn test_remove_missing_field_fails() {
        let change = SchemaChange::RemoveField {
            field: SchemaField::new("ghost", FieldType::Text),
            position: 0,
        };
        let err = apply(Some(posts()), &[change]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
    }

    #[test]
    fn test_update_on_missing_collection_fails() {
        let change = SchemaChange::ChangeRule {
            rule: RuleKind::List,
            old: None,
            new: Some(String::new()),
        };
        assert!(apply(None, &[change]).is_err());
        assert!(apply(Some(posts()), &[SchemaChange::CreateCollection(posts())]).is_err());
    }

    #[test]
    fn test_add_past_end_appends() {
        let change = SchemaChange::AddField {
            field: SchemaField::new("body", FieldType::Editor),
            position: 42,
        };
        let updated = apply(Some(posts()), &[change]).unwrap().unwrap();
        assert_eq!(updated.fields().last().map(SchemaField::name), Some("body"));
    }
}
