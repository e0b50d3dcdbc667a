//! TOML manager configuration.
//!
//! ```toml
//! name = "app"
//! default_dialect = "postgres"
//!
//! [[templates]]
//! dir = "sql"
//! patterns = ["**/*.sql"]
//!
//! [databases.main]
//! dialect = "postgres"
//! url = "${DATABASE_URL}"
//! lazy = true
//! ```
//!
//! `${VAR}` references are expanded from the environment when the file is
//! loaded. Relative template directories resolve against the file's
//! directory.

use crate::error::{DbError, DbResult};
use crate::manager::{DEFAULT_NAME, Manager};
use crate::template::TemplateSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub default_dialect: Option<String>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseConfig>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Falls back to the manager's default dialect.
    #[serde(default)]
    pub dialect: Option<String>,
    pub url: String,
    /// Connect on first use instead of at startup.
    #[serde(default)]
    pub lazy: bool,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            default_dialect: None,
            templates: Vec::new(),
            databases: BTreeMap::new(),
            base_dir: None,
        }
    }
}

impl ManagerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = Some(dialect.into());
        self
    }

    pub fn template_dir<I, S>(mut self, dir: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.templates.push(TemplateConfig {
            dir: dir.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn database(mut self, name: impl Into<String>, config: DatabaseConfig) -> Self {
        self.databases.insert(name.into(), config);
        self
    }

    /// Parse TOML text. Environment references are expanded.
    pub fn from_toml_str(raw: &str) -> DbResult<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|e| {
            DbError::Config(format!("failed to parse config file {}: {e}", path.display()))
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn resolve_path(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        match &self.base_dir {
            Some(base) if !p.is_absolute() => base.join(p),
            _ => p.to_path_buf(),
        }
    }

    pub fn template_sources(&self) -> Vec<TemplateSource> {
        self.templates
            .iter()
            .map(|t| TemplateSource::new(self.resolve_path(&t.dir)).patterns(t.patterns.clone()))
            .collect()
    }

    fn expand_env(&mut self) -> DbResult<()> {
        for db in self.databases.values_mut() {
            db.url = expand_env_vars(&db.url)?;
        }
        for t in &mut self.templates {
            let dir = expand_env_vars(&t.dir.to_string_lossy())?;
            t.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn validate(&self) -> DbResult<()> {
        if self.name.trim().is_empty() {
            return Err(DbError::Config("name must not be empty".into()));
        }
        for (name, db) in &self.databases {
            if db.url.trim().is_empty() {
                return Err(DbError::Config(format!("databases.{name}.url must not be empty")));
            }
            if db.dialect.is_none() && self.default_dialect.is_none() {
                return Err(DbError::Config(format!(
                    "databases.{name} has no dialect and no default_dialect is set"
                )));
            }
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            dialect: None,
            url: url.into(),
            lazy: false,
        }
    }

    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

pub(crate) fn expand_env_vars(input: &str) -> DbResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(DbError::Config(format!(
                    "unterminated env var reference: ${{{key}}}"
                )));
            }
            if key.is_empty() {
                return Err(DbError::Config("invalid env var reference: ${}".into()));
            }

            let v = std::env::var(&key).map_err(|_| {
                DbError::Config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

impl Manager {
    /// Build a manager from configuration.
    ///
    /// Only the built-in connectors are available; use
    /// [`apply_config`](Self::apply_config) after registering others.
    pub async fn from_config(config: &ManagerConfig) -> DbResult<Manager> {
        let manager = Manager::with_dialect(config.name.clone(), None);
        manager.apply_config(config).await?;
        Ok(manager)
    }

    /// Apply configuration to this manager.
    ///
    /// Template sources are registered first so every connection sees
    /// them. Eager databases are opened now, lazy ones on first `get`.
    pub async fn apply_config(&self, config: &ManagerConfig) -> DbResult<()> {
        if let Some(name) = &config.default_dialect {
            let dialect = self.dialects().lookup(name)?;
            self.set_default_dialect(dialect);
        }
        for source in config.template_sources() {
            self.add_template_source(source);
        }

        for (name, db) in &config.databases {
            let dialect = match &db.dialect {
                Some(dialect) => self.dialects().lookup(dialect)?,
                None => self.default_dialect()?,
            };
            if db.lazy {
                let url = db.url.clone();
                self.set_lazy(name, move |m| async move { m.connect(dialect, &url).await });
            } else {
                let opened = self.connect(dialect, &db.url).await?;
                self.set(name, opened);
            }
        }
        Ok(())
    }
}
