use super::{Options, RuleKind, Rules, SchemaField};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    Base,
    Auth,
    View,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Base => "base",
            CollectionKind::Auth => "auth",
            CollectionKind::View => "view",
        }
    }
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full definition of a collection as last observed in the schema store.
///
/// The JSON shape (`id`, `name`, `type`, `fields`, the five `*Rule`
/// properties, `indexes`, `options`) is also the payload embedded into the
/// generated migration scripts.
///
/// # Examples
///
/// ```
/// use automigrate::schema::{CollectionDefinition, FieldType, RuleKind, SchemaField};
///
/// let posts = CollectionDefinition::new("pbc_posts", "posts")
///     .with_field(SchemaField::new("title", FieldType::Text))
///     .with_rule(RuleKind::List, Some(""))
///     .with_index("CREATE INDEX idx_title ON posts (title)");
///
/// assert_eq!(posts.fields().len(), 1);
/// assert_eq!(posts.rules().list_rule.as_deref(), Some(""));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDefinition {
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    kind: CollectionKind,
    #[serde(default)]
    fields: Vec<SchemaField>,
    #[serde(flatten)]
    rules: Rules,
    #[serde(default)]
    indexes: Vec<String>,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    options: Options,
}

impl CollectionDefinition {
    pub fn new(id: &str, name: &str) -> Self {
        CollectionDefinition {
            id: id.to_string(),
            name: name.to_string(),
            kind: CollectionKind::Base,
            fields: Vec::new(),
            rules: Rules::default(),
            indexes: Vec::new(),
            options: Options::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_kind(mut self, kind: CollectionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: Vec<SchemaField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_rule(mut self, kind: RuleKind, rule: Option<&str>) -> Self {
        self.rules.set(kind, rule.map(str::to_string));
        self
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.indexes.push(index.to_string());
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Checks the invariants a store must uphold before exposing a definition.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty id or name, and for duplicate
    /// field names or field ids.
    pub fn validate(&self) -> AutomigrateResult<()> {
        if self.id.trim().is_empty() {
            return Err(AutomigrateError::new(
                "Collection id cannot be empty",
                ErrorKind::ValidationError,
            ));
        }
        if self.name.trim().is_empty() {
            return Err(AutomigrateError::new(
                "Collection name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        for (position, field) in self.fields.iter().enumerate() {
            let rest = &self.fields[position + 1..];
            if field.name().trim().is_empty() {
                return Err(AutomigrateError::new(
                    &format!("Field at position {} of {} has no name", position, self.name),
                    ErrorKind::ValidationError,
                ));
            }
            if rest.iter().any(|other| other.name() == field.name()) {
                return Err(AutomigrateError::new(
                    &format!("Duplicate field {} in collection {}", field.name(), self.name),
                    ErrorKind::ValidationError,
                ));
            }
            if let Some(id) = field.id() {
                if rest.iter().any(|other| other.id() == Some(id)) {
                    return Err(AutomigrateError::new(
                        &format!("Duplicate field id {} in collection {}", id, self.name),
                        ErrorKind::ValidationError,
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn set_kind(&mut self, kind: CollectionKind) {
        self.kind = kind;
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<SchemaField> {
        &mut self.fields
    }

    pub(crate) fn rules_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut Vec<String> {
        &mut self.indexes
    }

    pub(crate) fn set_options(&mut self, options: Options) {
        self.options = options;
    }
}
