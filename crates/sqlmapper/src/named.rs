//! Named-parameter compilation.
//!
//! Rewrites `:name` (or the dialect's named prefix) into positional
//! placeholders and collects the values in order. Quoted regions and doubled
//! prefixes (`::text`, `@@ROWCOUNT`, `$$`) are left untouched.

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::value::Value;
use serde_json::Value as Json;
use std::collections::BTreeMap;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `name` can follow the named prefix and resolve back to itself
/// as a single top-level key.
pub(crate) fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Look up a dotted path such as `user.name` in `arg`.
pub fn lookup<'a>(arg: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('.').try_fold(arg, |current, key| match current {
        Json::Object(map) => map.get(key),
        Json::Array(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

/// Named parameters of `sql`, in order of appearance.
pub fn parameter_names(dialect: &Dialect, sql: &str) -> Vec<String> {
    let mut names = Vec::new();
    scan(dialect, sql, |name| {
        names.push(name.to_string());
        Ok(String::new())
    })
    .map(|_| names)
    .unwrap_or_default()
}

/// Compile named SQL to positional SQL plus arguments.
pub fn compile_named(dialect: &Dialect, sql: &str, arg: &Json) -> DbResult<(String, Vec<Value>)> {
    let mut values = Vec::new();
    let compiled = scan(dialect, sql, |name| {
        let value = lookup(arg, name).ok_or_else(|| DbError::MissingArgument(name.to_string()))?;
        values.push(Value::from(value));
        Ok(dialect.placeholder_at(values.len()))
    })?;
    Ok((compiled, values))
}

/// Compile named SQL whose arguments are already [`Value`]s keyed by name.
pub fn compile_named_values(
    dialect: &Dialect,
    sql: &str,
    args: &BTreeMap<String, Value>,
) -> DbResult<(String, Vec<Value>)> {
    let mut values = Vec::with_capacity(args.len());
    let compiled = scan(dialect, sql, |name| {
        let value = args
            .get(name)
            .ok_or_else(|| DbError::MissingArgument(name.to_string()))?;
        values.push(value.clone());
        Ok(dialect.placeholder_at(values.len()))
    })?;
    Ok((compiled, values))
}

fn scan(
    dialect: &Dialect,
    sql: &str,
    mut on_param: impl FnMut(&str) -> DbResult<String>,
) -> DbResult<String> {
    let prefix = dialect.prefix();
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        if matches!(c, '\'' | '"' | '`') {
            let end = quoted_end(rest, c, dialect.uses_backslash_escapes() && c != '`');
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        if !prefix.is_empty() && rest.starts_with(prefix) {
            let after = &rest[prefix.len()..];
            if after.starts_with(prefix) {
                out.push_str(&rest[..prefix.len() * 2]);
                rest = &after[prefix.len()..];
                continue;
            }
            if after.chars().next().is_some_and(is_ident_start) {
                let len = after
                    .char_indices()
                    .find(|(_, c)| !is_ident_char(*c))
                    .map(|(i, _)| i)
                    .unwrap_or(after.len());
                let name = after[..len].trim_end_matches('.');
                out.push_str(&on_param(name)?);
                rest = &after[name.len()..];
                continue;
            }
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Ok(out)
}

/// Byte length of the quoted region starting at `s[0] == quote`, including
/// both quotes. An unterminated region runs to the end of input.
fn quoted_end(s: &str, quote: char, backslash: bool) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if backslash && c == '\\' {
            chars.next();
            continue;
        }
        if c == quote {
            return i + c.len_utf8();
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mysql_named_to_question_marks() {
        let (sql, args) = compile_named(
            &Dialect::mysql(),
            "SELECT * FROM user WHERE name=:name AND age>:age",
            &json!({"name": "bob", "age": 30}),
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM user WHERE name=? AND age>?");
        assert_eq!(args, vec![Value::from("bob"), Value::from(30)]);
    }

    #[test]
    fn postgres_numbers_placeholders_in_order() {
        let (sql, args) = compile_named(
            &Dialect::postgres(),
            "UPDATE t SET a=$a, b=$b WHERE id=$id AND a<>$a",
            &json!({"a": 1, "b": 2, "id": 3}),
        )
        .unwrap();
        assert_eq!(sql, "UPDATE t SET a=$1, b=$2 WHERE id=$3 AND a<>$4");
        assert_eq!(args.len(), 4);
        assert_eq!(args[3], Value::from(1));
    }

    #[test]
    fn quoted_regions_and_casts_untouched() {
        let (sql, args) = compile_named(
            &Dialect::mysql(),
            "SELECT ':skip', `:col`, x::text, 'it''s :no' FROM t WHERE a=:a",
            &json!({"a": true}),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT ':skip', `:col`, x::text, 'it''s :no' FROM t WHERE a=?"
        );
        assert_eq!(args, vec![Value::Bool(true)]);
    }

    #[test]
    fn mysql_backslash_inside_literal() {
        let (sql, _) =
            compile_named(&Dialect::mysql(), r"SELECT 'a\':b' WHERE x=:x", &json!({"x": 1}))
                .unwrap();
        assert_eq!(sql, r"SELECT 'a\':b' WHERE x=?");
    }

    #[test]
    fn positional_dollar_left_alone() {
        let (sql, args) =
            compile_named(&Dialect::postgres(), "SELECT $1, $$body$$", &json!({})).unwrap();
        assert_eq!(sql, "SELECT $1, $$body$$");
        assert!(args.is_empty());
    }

    #[test]
    fn mssql_system_variables() {
        let (sql, args) = compile_named(
            &Dialect::mssql(),
            "SELECT @@ROWCOUNT WHERE id=@id",
            &json!({"id": 5}),
        )
        .unwrap();
        assert_eq!(sql, "SELECT @@ROWCOUNT WHERE id=@p1");
        assert_eq!(args, vec![Value::from(5)]);
    }

    #[test]
    fn dotted_paths() {
        let (sql, args) = compile_named(
            &Dialect::mysql(),
            "SELECT :user.name, :ids.1.",
            &json!({"user": {"name": "x"}, "ids": [7, 8]}),
        )
        .unwrap();
        assert_eq!(sql, "SELECT ?, ?.");
        assert_eq!(args, vec![Value::from("x"), Value::from(8)]);
    }

    #[test]
    fn missing_argument() {
        let err = compile_named(&Dialect::mysql(), "SELECT :nope", &json!({})).unwrap_err();
        assert!(matches!(err, DbError::MissingArgument(name) if name == "nope"));
    }

    #[test]
    fn names_in_order() {
        assert_eq!(
            parameter_names(&Dialect::mysql(), "a=:a AND b=:b OR ':c'"),
            vec!["a", "b"]
        );
    }
}
