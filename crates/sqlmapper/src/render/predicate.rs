//! WHERE / column / assignment / ORDER BY fragments.

use super::value::render_value;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::named::is_plain_name;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Characters that turn a map equality into a LIKE match.
const LIKE_MATCHERS: &[char] = &['%', '.', '?'];

/// Argument of a WHERE rendering.
#[derive(Clone, Copy, Debug)]
pub enum WhereArg<'a> {
    /// Every entry is a condition; text with wildcards uses LIKE.
    /// Keys are rendered in lexicographic order.
    Map(&'a Map<String, Json>),
    /// Fields in declaration order; zero values are skipped and the
    /// operator is always `=`.
    Record(&'a Map<String, Json>),
}

/// Whether a JSON value is the zero value of its type.
pub fn is_zero(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::Bool(b) => !b,
        Json::Number(n) => n.as_f64() == Some(0.0),
        Json::String(s) => s.is_empty(),
        Json::Array(items) => items.is_empty(),
        Json::Object(fields) => fields.values().all(is_zero),
    }
}

/// Render a WHERE clause.
///
/// `join` is the keyword placed between conditions (`AND` / `OR`). The
/// result starts with ` WHERE ` and ends with a single space, or is empty
/// when no condition is emitted.
///
/// In named mode every emitted key becomes a placeholder name, so keys that
/// are not plain identifiers are rejected with [`DbError::Render`].
pub fn render_where(
    dialect: &Dialect,
    arg: WhereArg<'_>,
    join: &str,
    named: bool,
) -> DbResult<String> {
    let mut conditions: Vec<(&str, &Json, bool)> = Vec::new();
    match arg {
        WhereArg::Map(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                let value = &map[key.as_str()];
                let like = value
                    .as_str()
                    .is_some_and(|s| s.contains(LIKE_MATCHERS));
                conditions.push((key.as_str(), value, like));
            }
        }
        WhereArg::Record(fields) => {
            for (key, value) in fields {
                if !is_zero(value) {
                    conditions.push((key.as_str(), value, false));
                }
            }
        }
    }

    if conditions.is_empty() {
        return Ok(String::new());
    }
    if named {
        if let Some((key, _, _)) = conditions.iter().find(|(key, _, _)| !is_plain_name(key)) {
            return Err(DbError::Render(format!(
                "key {key:?} cannot be used as a named parameter"
            )));
        }
    }

    let mut buf = String::with_capacity(256);
    let joiner = dialect.keyword_spaced(join);
    for (idx, (key, value, like)) in conditions.into_iter().enumerate() {
        if idx == 0 {
            buf.push_str(&dialect.keyword_spaced("WHERE"));
        } else {
            buf.push_str(&joiner);
        }
        buf.push_str(&dialect.sql_name(key));
        if like {
            buf.push_str(&dialect.keyword_spaced("LIKE"));
        } else {
            buf.push('=');
        }
        if named {
            buf.push_str(dialect.prefix());
            buf.push_str(key);
        } else {
            buf.push_str(&render_value(dialect, &Value::from(value)));
        }
    }
    buf.push(' ');
    Ok(buf)
}

/// `WHERE ... AND ...` with inlined literals.
pub fn where_clause(dialect: &Dialect, arg: WhereArg<'_>) -> String {
    // Inline mode has no failure path.
    render_where(dialect, arg, "AND", false).unwrap_or_default()
}

/// `WHERE ... AND ...` with named placeholders.
pub fn named_where_clause(dialect: &Dialect, arg: WhereArg<'_>) -> DbResult<String> {
    render_where(dialect, arg, "AND", true)
}

/// Column metadata read by the column helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(alias = "column_name", alias = "ColumnName")]
    pub name: String,
    #[serde(default, alias = "is_primary_key", alias = "IsPrimaryKey")]
    pub primary_key: bool,
    #[serde(default, alias = "Ignore")]
    pub ignore: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    fn is_writable(&self) -> bool {
        !self.ignore && !self.primary_key
    }
}

/// Quoted names of non-key, non-ignored columns.
pub fn columns(dialect: &Dialect, cols: &[Column]) -> String {
    cols.iter()
        .filter(|c| c.is_writable())
        .map(|c| dialect.quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quoted names of every column.
pub fn all_columns(dialect: &Dialect, cols: &[Column]) -> String {
    cols.iter()
        .map(|c| dialect.quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Named placeholders for non-key columns, e.g. `:name,:email`.
pub fn args(dialect: &Dialect, cols: &[Column]) -> String {
    cols.iter()
        .filter(|c| c.is_writable())
        .map(|c| format!("{}{}", dialect.prefix(), c.name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Assignment list for UPDATE, e.g. `` `name`=:name,`email`=:email ``.
pub fn set_args(dialect: &Dialect, cols: &[Column]) -> String {
    cols.iter()
        .filter(|c| c.is_writable())
        .map(|c| {
            format!(
                "{}={}{}",
                dialect.quote_identifier(&c.name),
                dialect.prefix(),
                c.name
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn direction(dir: &str) -> &'static str {
    if dir.trim().eq_ignore_ascii_case("desc") {
        "DESC"
    } else {
        "ASC"
    }
}

/// ` ORDER BY a ASC,b DESC ` in the given pair order; empty input renders
/// nothing. Anything other than `desc` is treated as ascending.
pub fn order_by<K: AsRef<str>, D: AsRef<str>>(dialect: &Dialect, pairs: &[(K, D)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut buf = dialect.keyword_spaced("ORDER BY");
    for (idx, (column, dir)) in pairs.iter().enumerate() {
        if idx > 0 {
            buf.push(',');
        }
        buf.push_str(&dialect.sql_name(column.as_ref()));
        buf.push(' ');
        buf.push_str(dialect.keyword(direction(dir.as_ref())));
    }
    buf.push(' ');
    buf
}
