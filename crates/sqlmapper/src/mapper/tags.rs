//! Field tag strings: `ds:"orders" sql:"find.sql" tx:"Serializable" readonly:"true"`.

use crate::error::{DbError, DbResult};
use crate::transaction::{IsolationLevel, TxOptions};
use std::fmt;
use std::str::FromStr;

pub const TAG_DS: &str = "ds";
pub const TAG_SQL: &str = "sql";
pub const TAG_TX: &str = "tx";
pub const TAG_READONLY: &str = "readonly";

/// Binding metadata declared on one mapper field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldTags {
    /// Data source override.
    pub ds: Option<String>,
    /// Template name (`*.sql`) or inline SQL.
    pub sql: Option<String>,
    pub isolation: Option<IsolationLevel>,
    pub read_only: Option<bool>,
}

impl FieldTags {
    /// Parse a tag string. Unknown keys are ignored, empty values count as
    /// absent.
    pub fn parse(tag: &str) -> DbResult<Self> {
        let mut tags = Self::default();
        for (key, value) in pairs(tag)? {
            match key {
                TAG_DS => tags.ds = non_empty(value),
                TAG_SQL => tags.sql = non_empty(value),
                TAG_TX => {
                    tags.isolation = non_empty(value).map(|v| IsolationLevel::parse_keyword(&v))
                }
                TAG_READONLY => tags.read_only = non_empty(value).map(|v| parse_read_only(&v)),
                _ => {}
            }
        }
        Ok(tags)
    }

    /// Overwrite every key set in `other`.
    pub fn merge(&mut self, other: FieldTags) {
        if other.ds.is_some() {
            self.ds = other.ds;
        }
        if other.sql.is_some() {
            self.sql = other.sql;
        }
        if other.isolation.is_some() {
            self.isolation = other.isolation;
        }
        if other.read_only.is_some() {
            self.read_only = other.read_only;
        }
    }

    pub fn tx_options(&self) -> TxOptions {
        TxOptions::new()
            .isolation(self.isolation.unwrap_or_default())
            .read_only(self.read_only.unwrap_or(false))
    }
}

impl FromStr for FieldTags {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ds) = &self.ds {
            parts.push(format!("{TAG_DS}:{}", quote(ds)));
        }
        if let Some(sql) = &self.sql {
            parts.push(format!("{TAG_SQL}:{}", quote(sql)));
        }
        if let Some(isolation) = self.isolation {
            parts.push(format!("{TAG_TX}:{}", quote(isolation.as_keyword())));
        }
        if let Some(read_only) = self.read_only {
            parts.push(format!("{TAG_READONLY}:\"{read_only}\""));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Any value other than empty or `false` (case-insensitive) is true.
pub fn parse_read_only(value: &str) -> bool {
    !value.is_empty() && !value.eq_ignore_ascii_case("false")
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Split `key:"value" key2:"value2"` into pairs.
fn pairs(tag: &str) -> DbResult<Vec<(&str, String)>> {
    let mut out = Vec::new();
    let mut rest = tag.trim_start();

    while !rest.is_empty() {
        let colon = rest
            .find(':')
            .ok_or_else(|| DbError::bind(format!("malformed tag near `{rest}`")))?;
        let key = &rest[..colon];
        if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c == '"') {
            return Err(DbError::bind(format!("malformed tag key `{key}`")));
        }

        let mut chars = rest[colon + 1..].char_indices();
        if !matches!(chars.next(), Some((_, '"'))) {
            return Err(DbError::bind(format!("tag `{key}` value must be quoted")));
        }

        let mut value = String::new();
        let mut end = None;
        while let Some((idx, c)) = chars.next() {
            match c {
                '"' => {
                    end = Some(colon + 1 + idx + 1);
                    break;
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                _ => value.push(c),
            }
        }
        let end = end.ok_or_else(|| DbError::bind(format!("unterminated tag `{key}`")))?;

        out.push((key, value));
        rest = rest[end..].trim_start();
    }
    Ok(out)
}
