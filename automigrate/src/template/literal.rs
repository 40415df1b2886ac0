//! Literal encoding for the supported script dialects.

use crate::errors::AutomigrateResult;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fmt::Write;

/// Encodes `value` as a double quoted JavaScript string literal.
pub(crate) fn js_string(value: &str) -> AutomigrateResult<String> {
    let encoded = serde_json::to_string(value)?;
    Ok(escape_line_separators(&encoded))
}

/// Encodes `value` as a pretty printed JavaScript object/array literal.
///
/// Continuation lines are prefixed with `indent` so the literal lines up
/// with the statement it is embedded in.
pub(crate) fn js_json<T: Serialize + ?Sized>(value: &T, indent: &str) -> AutomigrateResult<String> {
    let encoded = pretty_json(value, b"  ")?;
    Ok(indent_continuation(&escape_line_separators(&encoded), indent))
}

/// Encodes `value` as an interpreted (double quoted) Go string literal.
pub(crate) fn go_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                // writing into a String cannot fail
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Encodes `value` as pretty printed JSON inside a Go raw string literal.
///
/// Backticks cannot appear in a raw string, so each one is spliced in as an
/// interpreted literal: `` `a` + "`" + `b` ``.
pub(crate) fn go_raw_json<T: Serialize + ?Sized>(value: &T, indent: &str) -> AutomigrateResult<String> {
    let encoded = indent_continuation(&pretty_json(value, b"\t")?, indent);
    Ok(format!("`{}`", encoded.replace('`', "` + \"`\" + `")))
}

/// Makes arbitrary text safe to place after a `//` line comment.
pub(crate) fn comment_text(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn pretty_json<T: Serialize + ?Sized>(value: &T, indent: &[u8]) -> AutomigrateResult<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buffer)?)
}

fn escape_line_separators(value: &str) -> String {
    value
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn indent_continuation(text: &str, indent: &str) -> String {
    text.replace('\n', &format!("\n{}", indent))
}
