//! Literal rendering.
//!
//! Everything inlined into SQL text as a literal passes through
//! [`render_value`].

use crate::dialect::Dialect;
use crate::value::Value;

/// Escape text for use inside a single-quoted SQL literal.
pub fn escape(dialect: &Dialect, text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect.uses_backslash_escapes() => out.push_str("\\\\"),
            '\0' if dialect.uses_backslash_escapes() => out.push_str("\\0"),
            '\n' if dialect.uses_backslash_escapes() => out.push_str("\\n"),
            '\r' if dialect.uses_backslash_escapes() => out.push_str("\\r"),
            '\u{1a}' if dialect.uses_backslash_escapes() => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}

fn quoted(dialect: &Dialect, text: &str) -> String {
    format!("'{}'", escape(dialect, text))
}

/// Render one value as a SQL literal.
pub fn render_value(dialect: &Dialect, value: &Value) -> String {
    match value {
        Value::Null => dialect.keyword("NULL").to_string(),
        Value::Text(s) => quoted(dialect, s),
        Value::DateTime(dt) => dialect.format_datetime(dt),
        Value::Bool(true) => dialect.keyword("TRUE").to_string(),
        Value::Bool(false) => dialect.keyword("FALSE").to_string(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Bytes(b) => quoted(dialect, &String::from_utf8_lossy(b)),
        Value::Json(v) => quoted(dialect, &v.to_string()),
        Value::List(_) => quoted(dialect, &value.to_json().to_string()),
    }
}

/// Render a list as comma-joined literals; any other value renders alone.
pub fn render_values(dialect: &Dialect, value: &Value) -> String {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| render_value(dialect, item))
            .collect::<Vec<_>>()
            .join(","),
        other => render_value(dialect, other),
    }
}
