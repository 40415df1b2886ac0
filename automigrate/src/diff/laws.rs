//! Property tests for `diff`, `invert` and `apply`.

use super::{apply, diff, invert};
use crate::schema::{CollectionDefinition, CollectionKind, FieldType, RuleKind, SchemaField};
use proptest::prelude::*;

const FIELD_NAMES: [&str; 5] = ["title", "body", "views", "author", "slug"];

// the first three slots carry ids, the rest are matched by name
const SLOTS_WITH_ID: usize = 3;

const INDEXES: [&str; 3] = [
    "CREATE INDEX idx_title ON posts (title)",
    "CREATE UNIQUE INDEX idx_slug ON posts (slug)",
    "CREATE INDEX idx_views ON posts (views)",
];

fn field(slot: usize) -> impl Strategy<Value = Option<SchemaField>> {
    let field_type = prop_oneof![
        Just(FieldType::Text),
        Just(FieldType::Number),
        Just(FieldType::Json),
    ];
    (any::<bool>(), 0..3usize, any::<bool>(), field_type).prop_map(
        move |(present, variant, required, field_type)| {
            present.then(|| {
                let name = match variant {
                    0 => FIELD_NAMES[slot].to_string(),
                    n => format!("{}_{}", FIELD_NAMES[slot], n),
                };
                let field = SchemaField::new(&name, field_type).with_required(required);
                if slot < SLOTS_WITH_ID {
                    field.with_id(&format!("f{}", slot))
                } else {
                    field
                }
            })
        },
    )
}

fn rule() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("@request.auth.id != ''".to_string())),
    ]
}

prop_compose! {
    fn collection()(
        renamed in any::<bool>(),
        auth in any::<bool>(),
        fields in (field(0), field(1), field(2), field(3), field(4)),
        keep_indexes in proptest::collection::vec(any::<bool>(), INDEXES.len()),
        index_order in Just(INDEXES.to_vec()).prop_shuffle(),
        list_rule in rule(),
        delete_rule in rule(),
        view_query in proptest::option::of(Just("SELECT id FROM posts")),
    ) -> CollectionDefinition {
        let (title, body, views, author, slug) = fields;
        let kind = if auth { CollectionKind::Auth } else { CollectionKind::Base };

        let mut definition = CollectionDefinition::new("pbc_posts", if renamed { "articles" } else { "posts" })
            .with_kind(kind)
            .with_fields([title, body, views, author, slug].into_iter().flatten().collect())
            .with_rule(RuleKind::List, list_rule.as_deref())
            .with_rule(RuleKind::Delete, delete_rule.as_deref());
        for (index, keep) in index_order.into_iter().zip(keep_indexes) {
            if keep {
                definition = definition.with_index(index);
            }
        }
        if let Some(query) = view_query {
            definition = definition.with_option("viewQuery", query);
        }
        definition
    }
}

proptest! {
    #[test]
    fn diff_of_identical_collections_is_empty(a in collection()) {
        prop_assert!(diff(Some(&a), Some(&a)).is_empty());
    }

    #[test]
    fn invert_equals_reverse_diff(a in collection(), b in collection()) {
        prop_assert_eq!(invert(&diff(Some(&a), Some(&b))), diff(Some(&b), Some(&a)));
    }

    #[test]
    fn invert_twice_is_identity(a in collection(), b in collection()) {
        let up = diff(Some(&a), Some(&b));
        prop_assert_eq!(invert(&invert(&up)), up);
    }

    #[test]
    fn apply_replays_both_directions(a in collection(), b in collection()) {
        let up = diff(Some(&a), Some(&b));
        prop_assert_eq!(apply(Some(a.clone()), &up).unwrap(), Some(b.clone()));
        prop_assert_eq!(apply(Some(b), &invert(&up)).unwrap(), Some(a));
    }

    #[test]
    fn create_and_delete_are_single_changes(a in collection()) {
        let created = diff(None, Some(&a));
        prop_assert_eq!(created.len(), 1);
        prop_assert!(created[0].is_collection_level());
        prop_assert_eq!(apply(None, &created).unwrap(), Some(a.clone()));
        prop_assert_eq!(apply(Some(a.clone()), &invert(&created)).unwrap(), None);
    }
}
