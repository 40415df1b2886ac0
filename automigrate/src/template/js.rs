use super::literal::{comment_text, js_json, js_string};
use super::{TemplateLang, TemplateRenderer};
use crate::diff::SchemaChange;
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::schema::CollectionDefinition;
use itertools::Itertools;

const INDENT: &str = "  ";

/// Renders JavaScript migrations of the form
/// `migrate((app) => { up }, (app) => { down })`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsTemplate;

impl JsTemplate {
    fn statement(&self, change: &SchemaChange) -> AutomigrateResult<String> {
        let statement = match change {
            SchemaChange::RenameCollection { new_name, .. } => {
                format!("collection.name = {}", js_string(new_name)?)
            }
            SchemaChange::ChangeKind { new, .. } => {
                format!("collection.type = {}", js_string(new.as_str())?)
            }
            SchemaChange::DropIndex { index, .. } => format!(
                "collection.indexes = collection.indexes.filter((idx) => idx !== {})",
                js_string(index)?
            ),
            SchemaChange::RemoveField { field, .. } => {
                format!("collection.fields.removeByName({})", js_string(field.name())?)
            }
            SchemaChange::AlterField {
                new, new_position, ..
            }
            | SchemaChange::RenameField {
                new, new_position, ..
            } => format!(
                "collection.fields.addAt({}, new Field({}))",
                new_position,
                js_json(new, INDENT)?
            ),
            SchemaChange::AddField { field, position } => format!(
                "collection.fields.addAt({}, new Field({}))",
                position,
                js_json(field, INDENT)?
            ),
            SchemaChange::AddIndex { index, position } => format!(
                "collection.indexes.splice({}, 0, {})",
                position,
                js_string(index)?
            ),
            SchemaChange::ChangeRule { rule, new, .. } => {
                let value = match new {
                    Some(rule) => js_string(rule)?,
                    None => "null".to_string(),
                };
                format!("collection.{} = {}", rule.property(), value)
            }
            // assigned whole, so keys missing from `new` are dropped
            SchemaChange::ChangeOptions { new, .. } => {
                format!("collection.options = {}", js_json(new, INDENT)?)
            }
            SchemaChange::CreateCollection(_) | SchemaChange::DeleteCollection(_) => {
                return Err(AutomigrateError::new(
                    &format!("Cannot render '{}' as a statement", change),
                    ErrorKind::RenderError,
                ));
            }
        };
        Ok(format!(
            "{INDENT}// {}\n{INDENT}{}",
            comment_text(&change.to_string()),
            statement
        ))
    }
}

impl TemplateRenderer for JsTemplate {
    fn lang(&self) -> TemplateLang {
        TemplateLang::Js
    }

    fn create_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String> {
        Ok(format!(
            "{INDENT}const collection = new Collection({});\n\n{INDENT}return app.save(collection);",
            js_json(definition, INDENT)?
        ))
    }

    fn delete_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String> {
        Ok(format!(
            "{INDENT}const collection = app.findCollectionByNameOrId({});\n\n{INDENT}return app.delete(collection);",
            js_string(definition.id())?
        ))
    }

    fn update_body(&self, collection_id: &str, changes: &[SchemaChange]) -> AutomigrateResult<String> {
        let mut sections = vec![format!(
            "{INDENT}const collection = app.findCollectionByNameOrId({});",
            js_string(collection_id)?
        )];
        let statements: Vec<String> = changes
            .iter()
            .map(|change| self.statement(change))
            .try_collect()?;
        sections.extend(statements);
        sections.push(format!("{INDENT}return app.save(collection);"));
        Ok(sections.join("\n\n"))
    }

    fn wrap(&self, label: &str, up: &str, down: &str) -> String {
        format!(
            "/// <reference path=\"../pb_data/types.d.ts\" />\n\
             // {}\n\
             migrate((app) => {{\n{}\n}}, (app) => {{\n{}\n}})\n",
            comment_text(label),
            up,
            down
        )
    }

    fn render_snapshot(&self, collections: &[CollectionDefinition]) -> AutomigrateResult<String> {
        let up = format!(
            "{INDENT}const snapshot = {};\n\n{INDENT}return app.importCollections(snapshot, false);",
            js_json(collections, INDENT)?
        );
        let down = format!("{INDENT}return null;");
        Ok(self.wrap(crate::common::COLLECTIONS_SNAPSHOT_LABEL, &up, &down))
    }

    fn render_blank(&self, label: &str) -> String {
        self.wrap(
            label,
            &format!("{INDENT}// add up queries..."),
            &format!("{INDENT}// add down queries..."),
        )
    }
}
