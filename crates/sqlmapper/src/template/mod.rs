//! Per-connection SQL template registry.
//!
//! A [`TemplateSet`] wraps a Handlebars registry with the SQL helpers bound
//! to one dialect. Rendering takes a shared lock, registration an exclusive
//! one, so templates are never mutated during an in-flight render.
//!
//! Any SQL-or-template argument ending in [`SQL_SUFFIX`] is rendered by
//! template name; everything else is passed through untouched.

pub mod helpers;
pub mod source;

pub use source::TemplateSource;

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reserved suffix marking a template name.
pub const SQL_SUFFIX: &str = ".sql";

/// Whether `sql_or_template` names a template.
pub fn is_template(sql_or_template: &str) -> bool {
    sql_or_template.ends_with(SQL_SUFFIX)
}

fn new_registry(dialect: &Arc<Dialect>) -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    helpers::register_all(&mut registry, dialect);
    registry
}

/// Named templates bound to one dialect.
pub struct TemplateSet {
    dialect: Arc<Dialect>,
    registry: RwLock<Handlebars<'static>>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("dialect", &self.dialect.name())
            .field("templates", &self.names())
            .finish()
    }
}

impl TemplateSet {
    /// Empty set with the SQL helpers installed.
    pub fn new(dialect: Arc<Dialect>) -> Self {
        let registry = new_registry(&dialect);
        Self {
            dialect,
            registry: RwLock::new(registry),
        }
    }

    /// Set pre-loaded with the built-in templates.
    pub fn with_builtin(dialect: Arc<Dialect>) -> DbResult<Self> {
        let set = Self::new(dialect);
        set.install_builtin()?;
        Ok(set)
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    fn read(&self) -> RwLockReadGuard<'_, Handlebars<'static>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Handlebars<'static>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse and register a template; an existing one with the same name
    /// is overridden.
    pub fn register(&self, name: &str, source: &str) -> DbResult<()> {
        self.write().register_template_string(name, source)?;
        tracing::trace!(template = %name, "registered sql template");
        Ok(())
    }

    pub(crate) fn install_builtin(&self) -> DbResult<()> {
        let mut registry = self.write();
        for (name, source) in source::BUILTIN {
            registry.register_template_string(name, source.trim_end())?;
        }
        Ok(())
    }

    /// Load every file of `source`. Returns the number of templates.
    pub fn load(&self, source: &TemplateSource) -> DbResult<usize> {
        let files = source.read()?;
        let mut registry = self.write();
        for (name, text) in &files {
            registry.register_template_string(name, text)?;
        }
        Ok(files.len())
    }

    /// Swap the whole template set for `templates`, keeping the helpers.
    ///
    /// The new registry is built first so a parse error leaves the current
    /// set untouched.
    pub fn replace<I, N, S>(&self, templates: I) -> DbResult<()>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut fresh = new_registry(&self.dialect);
        for (name, source) in templates {
            fresh.register_template_string(name.as_ref(), source.as_ref())?;
        }
        *self.write() = fresh;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().has_template(name)
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().get_templates().keys().cloned().collect();
        names.sort();
        names
    }

    /// Render a registered template against `data`.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> DbResult<String> {
        let sql = self.read().render(name, data)?;
        tracing::trace!(template = %name, sql = %sql, "rendered sql template");
        Ok(sql)
    }

    /// Render when `sql_or_template` ends in `.sql`, otherwise return it
    /// unchanged.
    pub fn render_sql<T: Serialize>(
        &self,
        sql_or_template: &str,
        data: &T,
    ) -> DbResult<String> {
        if is_template(sql_or_template) {
            self.render(sql_or_template, data)
        } else {
            Ok(sql_or_template.to_string())
        }
    }

    /// First candidate that is registered.
    pub fn resolve<'a>(&self, candidates: &'a [String]) -> DbResult<&'a str> {
        let registry = self.read();
        candidates
            .iter()
            .find(|name| registry.has_template(name))
            .map(String::as_str)
            .ok_or_else(|| DbError::TemplateNotFound {
                candidates: candidates.to_vec(),
            })
    }
}

#[cfg(test)]
mod tests;
