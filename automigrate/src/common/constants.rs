/// Event type under which schema mutations are published on the bus.
pub const SCHEMA_EVENT: &str = "schema_event";

/// Action label of the full collections snapshot migration.
pub const COLLECTIONS_SNAPSHOT_LABEL: &str = "collections_snapshot";

/// Default migrations directory for JavaScript templates.
pub const DEFAULT_JS_MIGRATIONS_DIR: &str = "pb_migrations";

/// Default migrations directory for Go templates.
pub const DEFAULT_GO_MIGRATIONS_DIR: &str = "migrations";

/// Upper bound of timestamp bumps the writer attempts before giving up.
pub const MAX_FILENAME_ATTEMPTS: u32 = 1000;
