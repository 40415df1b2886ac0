use super::SchemaChange;
use crate::schema::{CollectionDefinition, RuleKind, SchemaField};

/// Computes the ordered change list turning `old` into `new`.
///
/// - absent → present: a single [`SchemaChange::CreateCollection`]
/// - present → absent: a single [`SchemaChange::DeleteCollection`]
/// - absent → absent: no changes
/// - present → present: a structural diff in canonical order
///
/// The output is a pure function of the inputs. Fields are matched by id
/// first and by name second; a matched pair whose name differs is a rename.
/// Fields without an id that change their name cannot be told apart from a
/// new field and come out as a removal plus an addition.
///
/// Type changes are reported as plain alterations, whether or not the
/// stored data can be converted.
///
/// # Examples
///
/// ```
/// use automigrate::diff::{diff, SchemaChange};
/// use automigrate::schema::{CollectionDefinition, FieldType, SchemaField};
///
/// let old = CollectionDefinition::new("pbc_posts", "posts")
///     .with_field(SchemaField::new("title", FieldType::Text).with_id("f1"));
/// let new = CollectionDefinition::new("pbc_posts", "posts")
///     .with_field(SchemaField::new("headline", FieldType::Text).with_id("f1"));
///
/// let changes = diff(Some(&old), Some(&new));
/// assert_eq!(changes.len(), 1);
/// assert!(matches!(changes[0], SchemaChange::RenameField { .. }));
/// ```
pub fn diff(
    old: Option<&CollectionDefinition>,
    new: Option<&CollectionDefinition>,
) -> Vec<SchemaChange> {
    match (old, new) {
        (None, None) => Vec::new(),
        (None, Some(new)) => vec![SchemaChange::CreateCollection(new.clone())],
        (Some(old), None) => vec![SchemaChange::DeleteCollection(old.clone())],
        (Some(old), Some(new)) => diff_collections(old, new),
    }
}

/// Inverts a change list.
///
/// The result undoes `changes` and is itself in canonical order, so
/// `invert(&diff(a, b)) == diff(b, a)`.
pub fn invert(changes: &[SchemaChange]) -> Vec<SchemaChange> {
    let mut inverted: Vec<SchemaChange> = changes.iter().map(SchemaChange::invert).collect();
    sort_changes(&mut inverted);
    inverted
}

pub(crate) fn sort_changes(changes: &mut [SchemaChange]) {
    changes.sort_by_key(SchemaChange::sort_key);
}

fn diff_collections(old: &CollectionDefinition, new: &CollectionDefinition) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    if old.name() != new.name() {
        changes.push(SchemaChange::RenameCollection {
            old_name: old.name().to_string(),
            new_name: new.name().to_string(),
        });
    }

    if old.kind() != new.kind() {
        changes.push(SchemaChange::ChangeKind {
            old: old.kind(),
            new: new.kind(),
        });
    }

    diff_indexes(old.indexes(), new.indexes(), &mut changes);
    diff_fields(old.fields(), new.fields(), &mut changes);

    for rule in RuleKind::ALL {
        let (before, after) = (old.rules().get(rule), new.rules().get(rule));
        if before != after {
            changes.push(SchemaChange::ChangeRule {
                rule,
                old: before.cloned(),
                new: after.cloned(),
            });
        }
    }

    if old.options() != new.options() {
        changes.push(SchemaChange::ChangeOptions {
            old: old.options().clone(),
            new: new.options().clone(),
        });
    }

    sort_changes(&mut changes);
    changes
}

fn diff_fields(old: &[SchemaField], new: &[SchemaField], changes: &mut Vec<SchemaChange>) {
    let matches = match_fields(old, new);

    let mut taken = vec![false; old.len()];
    for old_position in matches.iter().flatten() {
        taken[*old_position] = true;
    }

    for (position, field) in old.iter().enumerate() {
        if !taken[position] {
            changes.push(SchemaChange::RemoveField {
                field: field.clone(),
                position,
            });
        }
    }

    for (new_position, (field, matched)) in new.iter().zip(&matches).enumerate() {
        let Some(old_position) = *matched else {
            changes.push(SchemaChange::AddField {
                field: field.clone(),
                position: new_position,
            });
            continue;
        };

        let previous = &old[old_position];
        if previous.name() != field.name() {
            changes.push(SchemaChange::RenameField {
                old: previous.clone(),
                new: field.clone(),
                old_position,
                new_position,
            });
        } else if previous != field {
            changes.push(SchemaChange::AlterField {
                old: previous.clone(),
                new: field.clone(),
                old_position,
                new_position,
            });
        }
    }
}

/// For every field of `new`, the position of the `old` field it continues.
///
/// Ids are matched first. Remaining fields are matched by name only when at
/// least one side has no id: two different ids under the same name are a
/// dropped field and a new one.
fn match_fields(old: &[SchemaField], new: &[SchemaField]) -> Vec<Option<usize>> {
    let mut taken = vec![false; old.len()];
    let mut matches = vec![None; new.len()];

    for (new_position, field) in new.iter().enumerate() {
        let Some(id) = field.id() else { continue };
        let found = old
            .iter()
            .enumerate()
            .position(|(i, candidate)| !taken[i] && candidate.id() == Some(id));
        if let Some(old_position) = found {
            taken[old_position] = true;
            matches[new_position] = Some(old_position);
        }
    }

    for (new_position, field) in new.iter().enumerate() {
        if matches[new_position].is_some() {
            continue;
        }
        let found = old.iter().enumerate().position(|(i, candidate)| {
            !taken[i]
                && candidate.name() == field.name()
                && (candidate.id().is_none() || field.id().is_none())
        });
        if let Some(old_position) = found {
            taken[old_position] = true;
            matches[new_position] = Some(old_position);
        }
    }

    matches
}

fn diff_indexes(old: &[String], new: &[String], changes: &mut Vec<SchemaChange>) {
    let (kept, taken) = common_indexes(old, new);

    for (position, index) in old.iter().enumerate() {
        if !kept[position] {
            changes.push(SchemaChange::DropIndex {
                index: index.clone(),
                position,
            });
        }
    }

    for (position, index) in new.iter().enumerate() {
        if !taken[position] {
            changes.push(SchemaChange::AddIndex {
                index: index.clone(),
                position,
            });
        }
    }
}

/// Marks the indexes kept in place: a longest common subsequence of `old`
/// and `new`. Anything else, including a moved index, is dropped and added.
///
/// Among equally long subsequences the lexicographically smallest is kept,
/// which makes the choice independent of the argument order.
fn common_indexes(old: &[String], new: &[String]) -> (Vec<bool>, Vec<bool>) {
    let (n, m) = (old.len(), new.len());

    // lcs[i][j] is the length of the longest common subsequence of
    // old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut kept = vec![false; n];
    let mut taken = vec![false; m];
    let (mut i, mut j) = (0, 0);
    let mut remaining = lcs[0][0];
    while remaining > 0 {
        let mut best: Option<(usize, usize)> = None;
        for old_position in i..n {
            for new_position in j..m {
                let candidate = &old[old_position];
                if candidate != &new[new_position]
                    || lcs[old_position + 1][new_position + 1] != remaining - 1
                {
                    continue;
                }
                if best.map_or(true, |(b, _)| candidate < &old[b]) {
                    best = Some((old_position, new_position));
                }
            }
        }

        match best {
            Some((old_position, new_position)) => {
                kept[old_position] = true;
                taken[new_position] = true;
                i = old_position + 1;
                j = new_position + 1;
                remaining -= 1;
            }
            None => break,
        }
    }
    (kept, taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::apply;
    use crate::schema::{CollectionKind, FieldType};
    use serde_json::json;

    fn title() -> SchemaField {
        SchemaField::new("title", FieldType::Text).with_id("f_title")
    }

    fn body() -> SchemaField {
        SchemaField::new("body", FieldType::Editor).with_id("f_body")
    }

    fn posts() -> CollectionDefinition {
        CollectionDefinition::new("pbc_posts", "posts")
            .with_field(title())
            .with_field(body())
            .with_rule(RuleKind::List, Some(""))
            .with_index("CREATE INDEX idx_title ON posts (title)")
    }

    #[test]
    fn test_identical_definitions_have_no_changes() {
        assert!(diff(Some(&posts()), Some(&posts())).is_empty());
        assert!(diff(None, None).is_empty());
    }

    #[test]
    fn test_create_and_delete_carry_full_definition() {
        assert_eq!(
            diff(None, Some(&posts())),
            vec![SchemaChange::CreateCollection(posts())]
        );
        assert_eq!(
            diff(Some(&posts()), None),
            vec![SchemaChange::DeleteCollection(posts())]
        );
    }

    #[test]
    fn test_rename_with_stable_id_is_single_rename() {
        let renamed = posts().with_fields(vec![title().with_name("headline"), body()]);
        let changes = diff(Some(&posts()), Some(&renamed));
        assert_eq!(
            changes,
            vec![SchemaChange::RenameField {
                old: title(),
                new: title().with_name("headline"),
                old_position: 0,
                new_position: 0,
            }]
        );
    }

    #[test]
    fn test_rename_without_id_degrades_to_remove_and_add() {
        let anonymous = SchemaField::new("title", FieldType::Text);
        let old = CollectionDefinition::new("pbc_posts", "posts").with_field(anonymous.clone());
        let new = CollectionDefinition::new("pbc_posts", "posts")
            .with_field(anonymous.clone().with_name("headline"));

        assert_eq!(
            diff(Some(&old), Some(&new)),
            vec![
                SchemaChange::RemoveField {
                    field: anonymous.clone(),
                    position: 0,
                },
                SchemaChange::AddField {
                    field: anonymous.with_name("headline"),
                    position: 0,
                },
            ]
        );
    }

    #[test]
    fn test_same_name_different_ids_is_recreate() {
        let recreated = posts().with_fields(vec![
            SchemaField::new("title", FieldType::Text).with_id("f_other"),
            body(),
        ]);
        let changes = diff(Some(&posts()), Some(&recreated));
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], SchemaChange::RemoveField { .. }));
        assert!(matches!(changes[1], SchemaChange::AddField { .. }));
    }

    #[test]
    fn test_type_change_is_alter_even_if_incompatible() {
        let altered = posts().with_fields(vec![title().with_type(FieldType::Json), body()]);
        assert_eq!(
            diff(Some(&posts()), Some(&altered)),
            vec![SchemaChange::AlterField {
                old: title(),
                new: title().with_type(FieldType::Json),
                old_position: 0,
                new_position: 0,
            }]
        );
    }

    #[test]
    fn test_canonical_order_across_change_kinds() {
        let new = CollectionDefinition::new("pbc_posts", "articles")
            .with_kind(CollectionKind::Auth)
            .with_field(body().with_required(true))
            .with_field(SchemaField::new("slug", FieldType::Text).with_id("f_slug"))
            .with_rule(RuleKind::List, None)
            .with_rule(RuleKind::Delete, Some("@request.auth.id != ''"))
            .with_index("CREATE UNIQUE INDEX idx_slug ON articles (slug)")
            .with_option("manageRule", json!(null));

        let kinds: Vec<String> = diff(Some(&posts()), Some(&new))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "rename collection posts to articles",
                "change collection type base to auth",
                "drop index CREATE INDEX idx_title ON posts (title)",
                "remove field title",
                "update field body",
                "add field slug",
                "add index CREATE UNIQUE INDEX idx_slug ON articles (slug)",
                "update listRule",
                "update deleteRule",
                "update options",
            ]
        );
    }

    #[test]
    fn test_removals_follow_old_order_and_adds_follow_new_order() {
        let old = CollectionDefinition::new("pbc_x", "x")
            .with_field(SchemaField::new("a", FieldType::Text).with_id("a"))
            .with_field(SchemaField::new("b", FieldType::Text).with_id("b"))
            .with_field(SchemaField::new("c", FieldType::Text).with_id("c"));
        let new = CollectionDefinition::new("pbc_x", "x")
            .with_field(SchemaField::new("e", FieldType::Text).with_id("e"))
            .with_field(SchemaField::new("b", FieldType::Text).with_id("b"))
            .with_field(SchemaField::new("d", FieldType::Text).with_id("d"));

        let names: Vec<String> = diff(Some(&old), Some(&new))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec!["remove field a", "remove field c", "add field e", "add field d"]
        );
    }

    #[test]
    fn test_invert_of_diff_is_reverse_diff() {
        let new = posts()
            .with_name("articles")
            .with_fields(vec![
                SchemaField::new("slug", FieldType::Text).with_id("f_slug"),
                title().with_name("headline").with_required(true),
            ])
            .with_rule(RuleKind::View, Some("id != ''"))
            .with_index("CREATE INDEX idx_slug ON articles (slug)");

        let up = diff(Some(&posts()), Some(&new));
        assert_eq!(invert(&up), diff(Some(&new), Some(&posts())));
        assert_eq!(
            invert(&diff(None, Some(&posts()))),
            diff(Some(&posts()), None)
        );
    }

    #[test]
    fn test_duplicate_indexes_match_pairwise() {
        let old = CollectionDefinition::new("pbc_x", "x")
            .with_index("CREATE INDEX a ON x (a)")
            .with_index("CREATE INDEX a ON x (a)");
        let new = CollectionDefinition::new("pbc_x", "x").with_index("CREATE INDEX a ON x (a)");
        assert_eq!(
            diff(Some(&old), Some(&new)),
            vec![SchemaChange::DropIndex {
                index: "CREATE INDEX a ON x (a)".into(),
                position: 1,
            }]
        );
    }

    #[test]
    fn test_moved_index_is_dropped_and_added() {
        let first = "CREATE INDEX a ON x (a)";
        let second = "CREATE INDEX b ON x (b)";
        let old = CollectionDefinition::new("pbc_x", "x")
            .with_index(first)
            .with_index(second);
        let new = CollectionDefinition::new("pbc_x", "x")
            .with_index(second)
            .with_index(first);

        let up = diff(Some(&old), Some(&new));
        assert_eq!(
            up,
            vec![
                SchemaChange::DropIndex {
                    index: second.into(),
                    position: 1,
                },
                SchemaChange::AddIndex {
                    index: second.into(),
                    position: 0,
                },
            ]
        );
        assert_eq!(invert(&up), diff(Some(&new), Some(&old)));
        assert_eq!(apply(Some(old.clone()), &up).unwrap(), Some(new.clone()));
        assert_eq!(apply(Some(new), &invert(&up)).unwrap(), Some(old));
    }
}
