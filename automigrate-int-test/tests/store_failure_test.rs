use automigrate::errors::ErrorKind;
use automigrate::schema::{CollectionDefinition, FieldType, SchemaField};
use automigrate::store::{InMemorySchemaStore, SchemaStore, SchemaStoreProvider};
use automigrate::{AutoMigrator, AutomigrateBuilder, SchemaEvent, SchemaEventBus};
use automigrate_int_test::test_util::{
    cleanup, create_test_context, file_name, random_path, run_test, split_blocks, FlakyStore,
};

fn posts() -> CollectionDefinition {
    CollectionDefinition::new("pbc_posts", "posts")
        .with_field(SchemaField::new("title", FieldType::Text).with_id("text_title"))
}

#[test]
fn test_failed_lookup_writes_nothing_and_keeps_snapshot() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.fail_store(true);
            // the host save succeeds, only the migrator sees the failure
            ctx.store().save(posts())?;
            assert!(ctx.store().find_by_name_or_id("pbc_posts").is_ok());

            assert!(ctx.migration_files().is_empty());
            assert!(ctx.migrator().snapshot().entry("pbc_posts")?.is_none());

            ctx.fail_store(false);
            let written = ctx
                .migrator()
                .on_schema_change(&SchemaEvent::collection("pbc_posts"))?;
            let path = written.expect("migration should be written after recovery");
            assert!(file_name(&path).ends_with("_created_posts.js"));
            assert!(ctx.migrator().snapshot().entry("pbc_posts")?.is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missed_updates_are_folded_into_next_migration() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.store().save(posts())?;

            ctx.fail_store(true);
            ctx.store()
                .save(posts().with_field(SchemaField::new("body", FieldType::Editor)))?;
            ctx.store().save(
                posts()
                    .with_field(SchemaField::new("body", FieldType::Editor))
                    .with_field(SchemaField::new("views", FieldType::Number)),
            )?;
            assert_eq!(ctx.migration_files().len(), 1);

            ctx.fail_store(false);
            ctx.migrator()
                .on_schema_change(&SchemaEvent::collection("pbc_posts"))?;

            let script = ctx.read_migration("_updated_posts.js");
            let (up, down) = split_blocks(&script);
            assert!(up.contains("// add field body"));
            assert!(up.contains("// add field views"));
            assert!(down.contains("collection.fields.removeByName(\"body\")"));
            assert!(down.contains("collection.fields.removeByName(\"views\")"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_register_fails_when_baseline_cannot_load() {
    run_test(
        create_test_context,
        |ctx| {
            let memory = InMemorySchemaStore::new();
            let flaky = FlakyStore::new(memory);
            flaky.set_failing(true);

            let config = AutomigrateBuilder::new().migrations_dir(random_path()).build()?;
            let migrator = AutoMigrator::new(config, SchemaStore::new(flaky));
            let bus = SchemaEventBus::new();

            let err = migrator.register(&bus).expect_err("baseline load should fail");
            assert_eq!(err.kind(), &ErrorKind::StoreError);
            assert!(!migrator.is_registered());
            assert!(!bus.has_listeners());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unwritable_directory_keeps_snapshot() {
    run_test(
        create_test_context,
        |ctx| {
            // a plain file where the migrations directory should be
            std::fs::write(ctx.dir(), b"not a directory")?;

            ctx.store().save(posts())?;
            assert!(ctx.migrator().snapshot().entry("pbc_posts")?.is_none());

            std::fs::remove_file(ctx.dir())?;
            ctx.migrator()
                .on_schema_change(&SchemaEvent::collection("pbc_posts"))?;
            assert_eq!(ctx.migration_files().len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalidated_baseline_rejects_events_until_reloaded() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.migrator().snapshot().invalidate();
            ctx.store().save(posts())?;

            assert!(ctx.migration_files().is_empty());
            let err = ctx
                .migrator()
                .on_schema_change(&SchemaEvent::collection("pbc_posts"))
                .expect_err("event without baseline should fail");
            assert_eq!(err.kind(), &ErrorKind::BaselineNotLoaded);
            assert!(!ctx.migrator().snapshot().is_loaded());

            ctx.migrator().load_baseline()?;
            ctx.store().save(posts().with_name("articles"))?;
            let script = ctx.read_migration("_updated_posts.js");
            assert!(script.contains("collection.name = \"articles\""));
            Ok(())
        },
        cleanup,
    )
}
