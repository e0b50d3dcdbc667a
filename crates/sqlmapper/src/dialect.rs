//! SQL dialect descriptors.
//!
//! A [`Dialect`] is immutable once built and shared through `Arc`. Built-in
//! dialects live in process-wide statics; custom ones are registered in a
//! [`DialectRegistry`] owned by a [`Manager`](crate::Manager).

use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Maps a raw field/key name to its column name.
pub type NameFn = fn(&str) -> String;

/// Positional placeholder style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@p1`, `@p2`, ...
    AtP,
}

impl Placeholder {
    /// Render the placeholder for a 1-based argument index.
    pub fn render(self, index: usize) -> String {
        match self {
            Placeholder::Question => "?".to_string(),
            Placeholder::Dollar => format!("${index}"),
            Placeholder::AtP => format!("@p{index}"),
        }
    }
}

/// How LIMIT/OFFSET paging is spelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

/// Quoted `YYYY-MM-DD hh:mm:ss`.
pub const DEFAULT_DATE_FORMAT: &str = "'%Y-%m-%d %H:%M:%S'";

fn lower_case(name: &str) -> String {
    name.to_lowercase()
}

/// SQL generation rules for one database family.
#[derive(Clone, Debug)]
pub struct Dialect {
    name: String,
    supports_named: bool,
    named_prefix: String,
    placeholder: Placeholder,
    date_format: String,
    quote: (char, char),
    name_fn: NameFn,
    keywords: HashMap<String, String>,
    backslash_escapes: bool,
    limit_style: LimitStyle,
}

impl Dialect {
    /// Start a dialect with generic defaults: `:` named prefix, `?`
    /// placeholders, double-quoted identifiers, lower-cased names.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_named: true,
            named_prefix: ":".to_string(),
            placeholder: Placeholder::Question,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            quote: ('"', '"'),
            name_fn: lower_case,
            keywords: HashMap::new(),
            backslash_escapes: false,
            limit_style: LimitStyle::LimitOffset,
        }
    }

    pub fn supports_named(mut self, supported: bool) -> Self {
        self.supports_named = supported;
        self
    }

    pub fn named_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.named_prefix = prefix.into();
        self
    }

    pub fn placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// chrono format string, including any surrounding quotes.
    ///
    /// A string chrono cannot parse is ignored and the current format kept.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            tracing::warn!(dialect = %self.name, format = %format, "ignoring invalid date format");
            return self;
        }
        self.date_format = format;
        self
    }

    pub fn quote(mut self, open: char, close: char) -> Self {
        self.quote = (open, close);
        self
    }

    pub fn name_fn(mut self, name_fn: NameFn) -> Self {
        self.name_fn = name_fn;
        self
    }

    /// Spell `keyword` as `spelling` in generated SQL.
    pub fn keyword_override(mut self, keyword: &str, spelling: &str) -> Self {
        self.keywords
            .insert(keyword.to_string(), spelling.to_string());
        self
    }

    pub fn backslash_escapes(mut self, enabled: bool) -> Self {
        self.backslash_escapes = enabled;
        self
    }

    pub fn limit_style(mut self, style: LimitStyle) -> Self {
        self.limit_style = style;
        self
    }

    // ==================== accessors ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_named_supported(&self) -> bool {
        self.supports_named
    }

    pub fn prefix(&self) -> &str {
        &self.named_prefix
    }

    pub fn placeholder_style(&self) -> Placeholder {
        self.placeholder
    }

    /// Positional placeholder for a 1-based argument index.
    pub fn placeholder_at(&self, index: usize) -> String {
        self.placeholder.render(index)
    }

    pub fn uses_backslash_escapes(&self) -> bool {
        self.backslash_escapes
    }

    pub fn paging(&self) -> LimitStyle {
        self.limit_style
    }

    /// Format a date-time with the dialect's date format.
    ///
    /// Falls back to [`DEFAULT_DATE_FORMAT`] when the format needs fields a
    /// naive date-time lacks, such as `%z`.
    pub fn format_datetime(&self, value: &NaiveDateTime) -> String {
        let mut out = String::new();
        if write!(out, "{}", value.format(&self.date_format)).is_ok() {
            return out;
        }
        value.format(DEFAULT_DATE_FORMAT).to_string()
    }

    /// Apply the dialect's name function without quoting.
    pub fn column_name(&self, raw: &str) -> String {
        (self.name_fn)(raw)
    }

    /// Wrap an identifier in the dialect's quote characters.
    ///
    /// A closing quote character inside the identifier is doubled.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let (open, close) = self.quote;
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(open);
        for c in ident.chars() {
            if c == close {
                out.push(close);
            }
            out.push(c);
        }
        out.push(close);
        out
    }

    /// Name function then quoting: `UserName` → `` `username` `` on MySQL.
    pub fn sql_name(&self, raw: &str) -> String {
        self.quote_identifier(&self.column_name(raw))
    }

    /// Dialect spelling of a keyword, or the keyword itself.
    pub fn keyword<'a>(&'a self, keyword: &'a str) -> &'a str {
        self.keywords
            .get(keyword)
            .map(String::as_str)
            .unwrap_or(keyword)
    }

    /// Keyword surrounded by single spaces.
    pub fn keyword_spaced(&self, keyword: &str) -> String {
        format!(" {} ", self.keyword(keyword))
    }

    // ==================== built-ins ====================

    pub fn mysql() -> Arc<Dialect> {
        MYSQL.clone()
    }

    pub fn postgres() -> Arc<Dialect> {
        POSTGRES.clone()
    }

    pub fn mssql() -> Arc<Dialect> {
        MSSQL.clone()
    }

    pub fn sqlite() -> Arc<Dialect> {
        SQLITE.clone()
    }
}

static MYSQL: LazyLock<Arc<Dialect>> = LazyLock::new(|| {
    Arc::new(
        Dialect::new("mysql")
            .quote('`', '`')
            .backslash_escapes(true),
    )
});

static POSTGRES: LazyLock<Arc<Dialect>> = LazyLock::new(|| {
    Arc::new(
        Dialect::new("postgres")
            .named_prefix("$")
            .placeholder(Placeholder::Dollar),
    )
});

static MSSQL: LazyLock<Arc<Dialect>> = LazyLock::new(|| {
    Arc::new(
        Dialect::new("mssql")
            .named_prefix("@")
            .placeholder(Placeholder::AtP)
            .quote('[', ']')
            .keyword_override("TRUE", "1")
            .keyword_override("FALSE", "0")
            .limit_style(LimitStyle::OffsetFetch),
    )
});

static SQLITE: LazyLock<Arc<Dialect>> = LazyLock::new(|| {
    Arc::new(
        Dialect::new("sqlite")
            .keyword_override("TRUE", "1")
            .keyword_override("FALSE", "0"),
    )
});

fn canonical(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "postgresql" | "pg" => "postgres".to_string(),
        "sqlserver" => "mssql".to_string(),
        "sqlite3" => "sqlite".to_string(),
        other => other.to_string(),
    }
}

/// Name → dialect table.
///
/// Registration replaces the entry as a whole; dialects themselves are
/// never mutated.
#[derive(Debug)]
pub struct DialectRegistry {
    dialects: RwLock<HashMap<String, Arc<Dialect>>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut dialects = HashMap::new();
        for dialect in [
            Dialect::mysql(),
            Dialect::postgres(),
            Dialect::mssql(),
            Dialect::sqlite(),
        ] {
            dialects.insert(dialect.name().to_string(), dialect);
        }
        Self {
            dialects: RwLock::new(dialects),
        }
    }
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a dialect up by name or alias (case-insensitive).
    pub fn lookup(&self, name: &str) -> DbResult<Arc<Dialect>> {
        if name.is_empty() {
            return Err(DbError::NilDriver);
        }
        self.dialects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&canonical(name))
            .cloned()
            .ok_or_else(|| DbError::DialectNotFound(name.to_string()))
    }

    /// Register (or replace) a dialect under its own name.
    pub fn register(&self, dialect: Dialect) -> Arc<Dialect> {
        let dialect = Arc::new(dialect);
        self.dialects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical(dialect.name()), dialect.clone());
        dialect
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dialects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_quoting() {
        assert_eq!(Dialect::mysql().sql_name("Name"), "`name`");
        assert_eq!(Dialect::postgres().sql_name("name"), "\"name\"");
        assert_eq!(Dialect::mssql().sql_name("name"), "[name]");
    }

    #[test]
    fn quote_doubles_closing_char() {
        assert_eq!(Dialect::mysql().quote_identifier("a`b"), "`a``b`");
        assert_eq!(Dialect::mssql().quote_identifier("a]b"), "[a]]b]");
    }

    #[test]
    fn keyword_falls_back_to_input() {
        let mssql = Dialect::mssql();
        assert_eq!(mssql.keyword("TRUE"), "1");
        assert_eq!(mssql.keyword("ORDER BY"), "ORDER BY");
        assert_eq!(mssql.keyword_spaced("AND"), " AND ");
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::mysql().placeholder_at(3), "?");
        assert_eq!(Dialect::postgres().placeholder_at(3), "$3");
        assert_eq!(Dialect::mssql().placeholder_at(3), "@p3");
    }

    #[test]
    fn registry_lookup_and_aliases() {
        let registry = DialectRegistry::new();
        assert_eq!(registry.lookup("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(registry.lookup("sqlserver").unwrap().name(), "mssql");
        assert!(matches!(
            registry.lookup("oracle"),
            Err(DbError::DialectNotFound(_))
        ));
        assert!(matches!(registry.lookup(""), Err(DbError::NilDriver)));
    }

    #[test]
    fn register_replaces_without_mutating() {
        let registry = DialectRegistry::new();
        let before = registry.lookup("mysql").unwrap();
        registry.register(Dialect::new("mysql").named_prefix("@"));
        let after = registry.lookup("mysql").unwrap();
        assert_eq!(before.prefix(), ":");
        assert_eq!(after.prefix(), "@");
    }

    #[test]
    fn date_format_is_quoted() {
        let dt = NaiveDateTime::parse_from_str("2024-03-05 06:07:08", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(Dialect::mysql().format_datetime(&dt), "'2024-03-05 06:07:08'");
    }

    #[test]
    fn invalid_date_format_is_ignored() {
        let dt = NaiveDateTime::parse_from_str("2024-03-05 06:07:08", "%Y-%m-%d %H:%M:%S").unwrap();
        let custom = Dialect::new("custom").date_format("'%d/%m/%Y'");
        assert_eq!(custom.format_datetime(&dt), "'05/03/2024'");

        let bad = custom.date_format("'%Q'");
        assert_eq!(bad.format_datetime(&dt), "'05/03/2024'");
    }

    #[test]
    fn unformattable_date_format_falls_back() {
        let dt = NaiveDateTime::parse_from_str("2024-03-05 06:07:08", "%Y-%m-%d %H:%M:%S").unwrap();
        let zoned = Dialect::new("zoned").date_format("'%Y-%m-%d %z'");
        assert_eq!(zoned.format_datetime(&dt), "'2024-03-05 06:07:08'");
    }
}
