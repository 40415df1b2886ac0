//! # automigrate
//!
//! Generates migration files from live collection schema changes.
//!
//! An [`AutoMigrator`] listens for collection mutations on a
//! [`SchemaEventBus`], compares each mutated collection with the definition
//! it observed last and writes a reversible migration script describing the
//! difference. Scripts are rendered as JavaScript or Go and stored under
//! `<unix-timestamp>_<action>_<collection>.<ext>`.
//!
//! ## Pipeline
//!
//! - [`schema`]: collection, field and rule definitions
//! - [`store`]: the [`SchemaStoreProvider`](store::SchemaStoreProvider)
//!   seam to the host's schema, plus an in-memory implementation
//! - [`snapshot`]: cache of the last observed definitions
//! - [`diff`]: semantic diff, inversion and replay of change lists
//! - [`template`]: JavaScript and Go script renderers
//! - [`writer`]: collision free migration file writer
//! - [`listener`]: the [`AutoMigrator`] wiring all of the above
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use automigrate::store::{InMemorySchemaStore, SchemaStore};
//! use automigrate::schema::{CollectionDefinition, FieldType, SchemaField};
//! use automigrate::{AutoMigrator, AutomigrateBuilder, SchemaEventBus, TemplateLang};
//!
//! # fn main() -> automigrate::errors::AutomigrateResult<()> {
//! let config = AutomigrateBuilder::new()
//!     .template_lang(TemplateLang::Js)
//!     .migrations_dir("pb_migrations")
//!     .build()?;
//!
//! let bus = SchemaEventBus::new();
//! let store = InMemorySchemaStore::new();
//! store.attach_event_bus(bus.clone());
//!
//! let migrator = AutoMigrator::new(config, SchemaStore::new(store.clone()));
//! migrator.register(&bus)?;
//!
//! // writes pb_migrations/<ts>_created_posts.js
//! store.save(
//!     CollectionDefinition::new("pbc_posts", "posts")
//!         .with_field(SchemaField::new("title", FieldType::Text)),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod diff;
pub mod errors;
pub mod event;
pub mod listener;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod template;
pub mod writer;

pub use config::{AutomigrateBuilder, AutomigrateConfig};
pub use event::{EntityKind, SchemaEvent, SchemaEventBus, SchemaEventListener};
pub use listener::AutoMigrator;
pub use template::TemplateLang;
