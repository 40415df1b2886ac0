//! Migration script rendering.
//!
//! A [`TemplateRenderer`] turns a [`ChangeSet`] into the text of a migration
//! file with an up block and a down block. Two dialects ship with the crate,
//! [`JsTemplate`] and [`GoTemplate`], selected through [`TemplateLang`].

mod go;
mod js;
pub(crate) mod literal;

pub use go::GoTemplate;
pub use js::JsTemplate;

use crate::common::{DEFAULT_GO_MIGRATIONS_DIR, DEFAULT_JS_MIGRATIONS_DIR};
use crate::diff::{ChangeSet, SchemaChange};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::schema::CollectionDefinition;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

/// Target language of the generated migration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateLang {
    #[default]
    Js,
    Go,
}

impl TemplateLang {
    /// File extension of the generated files, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateLang::Js => "js",
            TemplateLang::Go => "go",
        }
    }

    /// Directory the generated files go to when none is configured.
    pub fn default_migrations_dir(&self) -> &'static str {
        match self {
            TemplateLang::Js => DEFAULT_JS_MIGRATIONS_DIR,
            TemplateLang::Go => DEFAULT_GO_MIGRATIONS_DIR,
        }
    }
}

impl Display for TemplateLang {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for TemplateLang {
    type Err = AutomigrateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(TemplateLang::Js),
            "go" => Ok(TemplateLang::Go),
            other => Err(AutomigrateError::new(
                &format!("Unsupported template language: {}", other),
                ErrorKind::ConfigError,
            )),
        }
    }
}

/// A migration script dialect.
///
/// Implementors only provide the dialect specific pieces; the provided
/// [`render`](TemplateRenderer::render) method decides which body each block
/// gets:
///
/// * a lone `CreateCollection` renders as a full collection creation,
/// * a lone `DeleteCollection` renders as a lookup and delete by id,
/// * anything else renders as an in-place update of the collection.
///
/// The down block is always rendered from the inverse of the up list.
pub trait TemplateRenderer: Send + Sync {
    /// Language this renderer produces.
    fn lang(&self) -> TemplateLang;

    /// File extension of the rendered scripts.
    fn extension(&self) -> &'static str {
        self.lang().extension()
    }

    /// Body creating `definition` from scratch.
    fn create_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String>;

    /// Body deleting the collection described by `definition`.
    fn delete_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String>;

    /// Body applying `changes` to the collection with id `collection_id`.
    ///
    /// `changes` never contains whole-collection variants.
    fn update_body(&self, collection_id: &str, changes: &[SchemaChange]) -> AutomigrateResult<String>;

    /// Assembles a complete file from its two bodies.
    fn wrap(&self, label: &str, up: &str, down: &str) -> String;

    /// Renders a file recreating all `collections` at once.
    fn render_snapshot(&self, collections: &[CollectionDefinition]) -> AutomigrateResult<String>;

    /// Renders a file with empty up and down blocks.
    fn render_blank(&self, label: &str) -> String;

    /// Renders a migration file for `change_set`.
    ///
    /// Returns `Ok(None)` when the change set is empty so that callers never
    /// write a migration that does nothing.
    fn render(&self, change_set: &ChangeSet, label: &str) -> AutomigrateResult<Option<String>> {
        if change_set.is_empty() {
            return Ok(None);
        }

        let up = self.body(change_set.collection_id(), change_set.up())?;
        let down = self.body(change_set.collection_id(), &change_set.down())?;
        Ok(Some(self.wrap(label, &up, &down)))
    }

    #[doc(hidden)]
    fn body(&self, collection_id: &str, changes: &[SchemaChange]) -> AutomigrateResult<String> {
        match changes {
            [SchemaChange::CreateCollection(definition)] => self.create_body(definition),
            [SchemaChange::DeleteCollection(definition)] => self.delete_body(definition),
            _ => {
                if let Some(change) = changes.iter().find(|c| c.is_collection_level()) {
                    return Err(AutomigrateError::new(
                        &format!("Cannot render '{}' as part of an update", change),
                        ErrorKind::RenderError,
                    ));
                }
                self.update_body(collection_id, changes)
            }
        }
    }
}

/// Shared handle to a [`TemplateRenderer`].
///
/// Dereferences to the underlying renderer, so all trait methods are
/// callable on it directly.
#[derive(Clone)]
pub struct Template {
    inner: Arc<dyn TemplateRenderer>,
}

impl Template {
    pub fn new<T: TemplateRenderer + 'static>(renderer: T) -> Self {
        Template {
            inner: Arc::new(renderer),
        }
    }

    /// Returns the built-in renderer for `lang`.
    pub fn for_lang(lang: TemplateLang) -> Self {
        match lang {
            TemplateLang::Js => Template::new(JsTemplate),
            TemplateLang::Go => Template::new(GoTemplate),
        }
    }
}

impl Deref for Template {
    type Target = Arc<dyn TemplateRenderer>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
