use super::Options;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Data type of a collection field.
///
/// Unknown type names are kept verbatim in [`FieldType::Other`] so that a
/// store exposing custom field types still diffs and renders correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Number,
    Bool,
    Email,
    Url,
    Editor,
    Date,
    Select,
    Json,
    File,
    Relation,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Bool => "bool",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Editor => "editor",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Json => "json",
            FieldType::File => "file",
            FieldType::Relation => "relation",
            FieldType::Other(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "bool" => FieldType::Bool,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "editor" => FieldType::Editor,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "json" => FieldType::Json,
            "file" => FieldType::File,
            "relation" => FieldType::Relation,
            _ => FieldType::Other(value),
        }
    }
}

impl From<&str> for FieldType {
    fn from(value: &str) -> Self {
        FieldType::from(value.to_string())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed field of a collection.
///
/// The optional `id` is the rename signal: a store that keeps a field's id
/// stable across a rename lets the diff engine report a rename instead of a
/// remove followed by an add.
///
/// # Examples
///
/// ```
/// use automigrate::schema::{FieldType, SchemaField};
///
/// let title = SchemaField::new("title", FieldType::Text)
///     .with_id("text3208210256")
///     .with_required(true);
/// assert_eq!(title.name(), "title");
/// assert_eq!(title.id(), Some("text3208210256"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    presentable: bool,
    #[serde(default)]
    system: bool,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    options: Options,
}

impl SchemaField {
    pub fn new(name: &str, field_type: impl Into<FieldType>) -> Self {
        SchemaField {
            id: None,
            name: name.to_string(),
            field_type: field_type.into(),
            required: false,
            presentable: false,
            system: false,
            options: Options::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_type(mut self, field_type: impl Into<FieldType>) -> Self {
        self.field_type = field_type.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_presentable(mut self, presentable: bool) -> Self {
        self.presentable = presentable;
        self
    }

    pub fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_presentable(&self) -> bool {
        self.presentable
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns `true` when `other` denotes the same field as `self`.
    ///
    /// Fields carrying an id are identified by it; fields without one fall
    /// back to their name.
    pub fn same_identity(&self, other: &SchemaField) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name,
        }
    }
}
