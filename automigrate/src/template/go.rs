use super::literal::{comment_text, go_raw_json, go_string};
use super::{TemplateLang, TemplateRenderer};
use crate::common::COLLECTIONS_SNAPSHOT_LABEL;
use crate::diff::SchemaChange;
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::schema::CollectionDefinition;
use itertools::Itertools;
use serde_json::json;

const INDENT: &str = "\t\t";

const LOOKUP_ERR_CHECK: &str = "\t\tif err != nil {\n\t\t\treturn err\n\t\t}";

/// Renders Go migrations registered through `m.Register` in an `init`
/// function of the `migrations` package.
///
/// The import list is derived from the rendered bodies so the file never
/// carries an unused import.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoTemplate;

impl GoTemplate {
    fn statement(&self, change: &SchemaChange) -> AutomigrateResult<String> {
        let statement = match change {
            SchemaChange::RenameCollection { new_name, .. } => {
                format!("{INDENT}collection.Name = {}", go_string(new_name))
            }
            SchemaChange::ChangeKind { new, .. } => {
                format!("{INDENT}collection.Type = {}", go_string(new.as_str()))
            }
            SchemaChange::DropIndex { index, .. } => format!(
                "{INDENT}collection.Indexes = slices.DeleteFunc(collection.Indexes, func(idx string) bool {{\n\
                 {INDENT}\treturn idx == {}\n\
                 {INDENT}}})",
                go_string(index)
            ),
            SchemaChange::RemoveField { field, .. } => {
                format!("{INDENT}collection.Fields.RemoveByName({})", go_string(field.name()))
            }
            SchemaChange::AlterField {
                new, new_position, ..
            }
            | SchemaChange::RenameField {
                new, new_position, ..
            } => add_field_at(*new_position, &go_raw_json(new, INDENT)?),
            SchemaChange::AddField { field, position } => {
                add_field_at(*position, &go_raw_json(field, INDENT)?)
            }
            SchemaChange::AddIndex { index, position } => format!(
                "{INDENT}collection.Indexes = slices.Insert(collection.Indexes, min({}, len(collection.Indexes)), {})",
                position,
                go_string(index)
            ),
            SchemaChange::ChangeRule { rule, new, .. } => {
                let value = match new {
                    Some(rule) => format!("types.Pointer({})", go_string(rule)),
                    None => "nil".to_string(),
                };
                format!("{INDENT}collection.{} = {}", rule.go_property(), value)
            }
            // unmarshalling merges into an existing map, so reset it first
            SchemaChange::ChangeOptions { new, .. } => format!(
                "{INDENT}collection.Options = nil\n\
                 {INDENT}if err := json.Unmarshal([]byte({}), &collection); err != nil {{\n\
                 {INDENT}\treturn err\n\
                 {INDENT}}}",
                go_raw_json(&json!({ "options": new }), INDENT)?
            ),
            SchemaChange::CreateCollection(_) | SchemaChange::DeleteCollection(_) => {
                return Err(AutomigrateError::new(
                    &format!("Cannot render '{}' as a statement", change),
                    ErrorKind::RenderError,
                ));
            }
        };
        Ok(format!(
            "{INDENT}// {}\n{}",
            comment_text(&change.to_string()),
            statement
        ))
    }

    fn lookup(&self, collection_id: &str) -> String {
        format!(
            "{INDENT}collection, err := app.FindCollectionByNameOrId({})\n{}",
            go_string(collection_id),
            LOOKUP_ERR_CHECK
        )
    }

    fn imports(&self, bodies: &str) -> String {
        let code = strip_literals_and_comments(bodies);
        let bodies = code.as_str();

        let mut std_imports = Vec::new();
        if bodies.contains("json.Unmarshal") {
            std_imports.push("\t\"encoding/json\"");
        }
        if bodies.contains("slices.") {
            std_imports.push("\t\"slices\"");
        }

        let mut pocketbase_imports = vec![
            "\t\"github.com/pocketbase/pocketbase/core\"",
            "\tm \"github.com/pocketbase/pocketbase/migrations\"",
        ];
        if bodies.contains("types.Pointer") {
            pocketbase_imports.push("\t\"github.com/pocketbase/pocketbase/tools/types\"");
        }

        if std_imports.is_empty() {
            pocketbase_imports.join("\n")
        } else {
            format!("{}\n\n{}", std_imports.join("\n"), pocketbase_imports.join("\n"))
        }
    }
}

/// Blanks out string literals and line comments, leaving only code.
fn strip_literals_and_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
                out.push_str("\"\"");
            }
            '`' => {
                for next in chars.by_ref() {
                    if next == '`' {
                        break;
                    }
                }
                out.push_str("``");
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn add_field_at(position: usize, raw_json: &str) -> String {
    format!(
        "{INDENT}if err := collection.Fields.AddMarshaledJSONAt({}, []byte({})); err != nil {{\n\
         {INDENT}\treturn err\n\
         {INDENT}}}",
        position, raw_json
    )
}

impl TemplateRenderer for GoTemplate {
    fn lang(&self) -> TemplateLang {
        TemplateLang::Go
    }

    fn create_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String> {
        Ok(format!(
            "{INDENT}jsonData := {}\n\n\
             {INDENT}collection := &core.Collection{{}}\n\
             {INDENT}if err := json.Unmarshal([]byte(jsonData), &collection); err != nil {{\n\
             {INDENT}\treturn err\n\
             {INDENT}}}\n\n\
             {INDENT}return app.Save(collection)",
            go_raw_json(definition, INDENT)?
        ))
    }

    fn delete_body(&self, definition: &CollectionDefinition) -> AutomigrateResult<String> {
        Ok(format!(
            "{}\n\n{INDENT}return app.Delete(collection)",
            self.lookup(definition.id())
        ))
    }

    fn update_body(&self, collection_id: &str, changes: &[SchemaChange]) -> AutomigrateResult<String> {
        let mut sections = vec![self.lookup(collection_id)];
        let statements: Vec<String> = changes
            .iter()
            .map(|change| self.statement(change))
            .try_collect()?;
        sections.extend(statements);
        sections.push(format!("{INDENT}return app.Save(collection)"));
        Ok(sections.join("\n\n"))
    }

    fn wrap(&self, label: &str, up: &str, down: &str) -> String {
        let imports = self.imports(&format!("{}\n{}", up, down));
        format!(
            "// {}\npackage migrations\n\n\
             import (\n{}\n)\n\n\
             func init() {{\n\
             \tm.Register(func(app core.App) error {{\n{}\n\
             \t}}, func(app core.App) error {{\n{}\n\
             \t}})\n\
             }}\n",
            comment_text(label),
            imports,
            up,
            down
        )
    }

    fn render_snapshot(&self, collections: &[CollectionDefinition]) -> AutomigrateResult<String> {
        let up = format!(
            "{INDENT}jsonData := {}\n\n\
             {INDENT}return app.ImportCollectionsByMarshaledJSON([]byte(jsonData), false)",
            go_raw_json(collections, INDENT)?
        );
        let down = format!("{INDENT}return nil");
        Ok(self.wrap(COLLECTIONS_SNAPSHOT_LABEL, &up, &down))
    }

    fn render_blank(&self, label: &str) -> String {
        self.wrap(
            label,
            &format!("{INDENT}// add up queries...\n\n{INDENT}return nil"),
            &format!("{INDENT}// add down queries...\n\n{INDENT}return nil"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeRecord, ChangeSet};
    use crate::schema::{FieldType, RuleKind, SchemaField};

    fn posts() -> CollectionDefinition {
        CollectionDefinition::new("pbc_posts", "posts")
            .with_field(SchemaField::new("title", FieldType::Text).with_id("f_title"))
    }

    fn render(old: Option<CollectionDefinition>, new: Option<CollectionDefinition>) -> String {
        let record = ChangeRecord::new(old, new).unwrap();
        GoTemplate
            .render(&ChangeSet::from_record(&record), &record.action_label())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_render_create() {
        let script = render(None, Some(posts()));
        assert!(script.starts_with("// created_posts\npackage migrations\n"));
        assert!(script.contains("\t\"encoding/json\"\n\n\t\"github.com/pocketbase/pocketbase/core\""));
        assert!(script.contains("jsonData := `{\n\t\t\t\"id\": \"pbc_posts\""));
        assert!(script.contains("collection := &core.Collection{}"));
        assert!(script.contains("return app.Save(collection)"));
        assert!(script.contains("app.FindCollectionByNameOrId(\"pbc_posts\")"));
        assert!(script.contains("return app.Delete(collection)"));
        assert!(!script.contains("\"slices\""));
        assert!(!script.contains("tools/types"));
    }

    #[test]
    fn test_render_update_imports_what_it_uses() {
        let updated = posts()
            .with_rule(RuleKind::View, Some(""))
            .with_index("CREATE INDEX idx_title ON posts (title)");
        let script = render(Some(posts()), Some(updated));
        let (up, down) = script.split_once("}, func(app core.App) error {").unwrap();

        assert!(script.contains("\t\"slices\"\n\n"));
        assert!(script.contains("\t\"github.com/pocketbase/pocketbase/tools/types\""));
        assert!(!script.contains("encoding/json"));
        assert!(up.contains("collection.ViewRule = types.Pointer(\"\")"));
        assert!(up.contains(
            "slices.Insert(collection.Indexes, min(0, len(collection.Indexes)), \"CREATE INDEX idx_title ON posts (title)\")"
        ));
        assert!(down.contains("collection.ViewRule = nil"));
        assert!(down.contains("slices.DeleteFunc(collection.Indexes, func(idx string) bool {"));
    }

    #[test]
    fn test_render_field_changes() {
        let updated = CollectionDefinition::new("pbc_posts", "posts")
            .with_field(SchemaField::new("headline", FieldType::Text).with_id("f_title"))
            .with_field(SchemaField::new("body", FieldType::Editor));
        let script = render(Some(posts()), Some(updated));
        let (up, down) = script.split_once("}, func(app core.App) error {").unwrap();

        assert!(up.contains("// rename field title to headline"));
        assert!(up.contains("collection.Fields.AddMarshaledJSONAt(0, []byte(`{"));
        assert!(up.contains("collection.Fields.AddMarshaledJSONAt(1, []byte(`{"));
        assert!(down.contains("collection.Fields.RemoveByName(\"body\")"));
        assert!(down.contains("\"name\": \"title\""));
    }

    #[test]
    fn test_options_are_replaced_not_merged() {
        let old = posts().with_option("viewQuery", "SELECT id FROM posts");
        let script = render(Some(old), Some(posts()));
        let (up, down) = script.split_once("}, func(app core.App) error {").unwrap();

        let reset = up.find("collection.Options = nil").unwrap();
        let unmarshal = up.find("json.Unmarshal([]byte(`{").unwrap();
        assert!(reset < unmarshal);
        assert!(up.contains("\"options\": {}"));
        assert!(!up.contains("viewQuery"));
        assert!(down.contains("collection.Options = nil"));
        assert!(down.contains("\"viewQuery\": \"SELECT id FROM posts\""));
        assert!(script.contains("\t\"encoding/json\""));
    }

    #[test]
    fn test_backticks_in_rules_and_json() {
        let updated = posts()
            .with_rule(RuleKind::List, Some("name = `x`"))
            .with_option("note", "use `code`");
        let script = render(Some(posts()), Some(updated));
        assert!(script.contains("types.Pointer(\"name = `x`\")"));
        assert!(script.contains("\"use ` + \"`\" + `code` + \"`\" + `\""));
    }

    #[test]
    fn test_imports_ignore_user_content() {
        let created = CollectionDefinition::new("pbc_x", "slices.x")
            .with_field(SchemaField::new("types.Pointer", FieldType::Text))
            .with_index("CREATE INDEX `slices.idx` ON x (a)");
        let script = render(None, Some(created));
        assert!(!script.contains("\t\"slices\""));
        assert!(!script.contains("tools/types"));
        assert!(script.contains("\t\"encoding/json\""));
    }

    #[test]
    fn test_strip_literals_and_comments() {
        let stripped = strip_literals_and_comments("a := \"x\\\"y\" // z\nb := `q`");
        assert_eq!(stripped, "a := \"\" \nb := ``");
    }

    #[test]
    fn test_render_snapshot_and_blank() {
        let snapshot = GoTemplate.render_snapshot(&[posts()]).unwrap();
        assert!(snapshot.starts_with("// collections_snapshot\n"));
        assert!(snapshot.contains("app.ImportCollectionsByMarshaledJSON([]byte(jsonData), false)"));
        assert!(snapshot.contains("jsonData := `[\n"));

        let blank = GoTemplate.render_blank("seed");
        assert!(blank.contains("// add up queries...\n\n\t\treturn nil"));
        assert!(!blank.contains("encoding/json"));
        assert!(blank.contains("m.Register(func(app core.App) error {"));
    }
}
