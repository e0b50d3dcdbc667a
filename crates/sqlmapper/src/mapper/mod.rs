//! Mapper binding.
//!
//! A mapper is a plain struct of bound functions. It builds itself from a
//! [`Binder`], one field at a time:
//!
//! ```ignore
//! #[derive(Debug, Deserialize)]
//! struct User { id: i64, name: String }
//!
//! struct UserMapper {
//!     db: Arc<Database>,
//!     find_by_name: NamedSelectFn<User>,
//!     count: GetFn<i64>,
//!     transfer: TxFn,
//! }
//!
//! impl Mapper for UserMapper {
//!     async fn bind(b: &Binder) -> DbResult<Self> {
//!         Ok(Self {
//!             db: b.database(),
//!             find_by_name: b.field("find_by_name").named_select().await?,
//!             count: b.field("count").sql("SELECT COUNT(*) FROM users").get().await?,
//!             transfer: b.field("transfer").tags(r#"tx:"Serializable""#)?.transaction().await?,
//!         })
//!     }
//! }
//!
//! let users: UserMapper = manager.bind("Default").await?;
//! ```
//!
//! Without an explicit `sql`, a field named `find_by_name` on
//! `app::repo::UserMapper` looks for the first registered template among
//! `app/repo/user_mapper/find_by_name.sql`, `repo/user_mapper/find_by_name.sql`,
//! `user_mapper/find_by_name.sql` and `find_by_name.sql`.

mod bound;
pub mod tags;

pub use bound::{ExecFn, GetFn, NamedExecFn, NamedGetFn, NamedSelectFn, SelectFn, TxFn};
pub use tags::FieldTags;

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::manager::Manager;
use crate::template::{SQL_SUFFIX, is_template};
use crate::transaction::{IsolationLevel, TxOptions};
use bound::Binding;
use heck::ToSnakeCase;
use std::future::Future;
use std::sync::Arc;

/// A struct whose fields are bound by a [`Binder`].
pub trait Mapper: Sized + Send {
    fn bind(binder: &Binder) -> impl Future<Output = DbResult<Self>> + Send;
}

/// Template namespace derived from a Rust type path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    /// Module path, snake_case segments joined with `/`.
    pub package: String,
    /// Type name in snake_case.
    pub type_name: String,
}

impl Namespace {
    /// Namespace of `M`, e.g. `app::repo::UserMapper` → `app/repo` +
    /// `user_mapper`. Generic arguments are dropped.
    pub fn of<M: ?Sized>() -> Self {
        Self::from_type_path(std::any::type_name::<M>())
    }

    pub fn from_type_path(path: &str) -> Self {
        let path = path.split('<').next().unwrap_or(path);
        let mut segments: Vec<String> = path
            .split("::")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_snake_case())
            .collect();
        let type_name = segments.pop().unwrap_or_default();
        Self {
            package: segments.join("/"),
            type_name,
        }
    }

    fn last_package(&self) -> &str {
        self.package.rsplit('/').next().unwrap_or_default()
    }

    /// Template lookup order for `field`, duplicates removed.
    pub fn candidates(&self, field: &str) -> Vec<String> {
        let file = format!("{}{SQL_SUFFIX}", field.to_snake_case());
        let all = [
            join(&[&self.package, &self.type_name, &file]),
            join(&[self.last_package(), &self.type_name, &file]),
            join(&[&self.type_name, &file]),
            file.clone(),
        ];
        let mut out: Vec<String> = Vec::with_capacity(all.len());
        for name in all {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    /// Name under which inline SQL for `field` is registered.
    pub fn inline_name(&self, field: &str) -> String {
        let file = format!("{}{SQL_SUFFIX}", field.to_snake_case());
        join(&[&self.package, &self.type_name, &file])
    }
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Binding context for one mapper type.
#[derive(Clone, Debug)]
pub struct Binder {
    manager: Manager,
    data_source: String,
    db: Arc<Database>,
    namespace: Namespace,
}

impl Binder {
    /// Resolve `data_source` and bind `M` against it.
    ///
    /// The connection is resolved before any field, so a missing data
    /// source fails immediately.
    pub async fn bind<M: Mapper>(manager: &Manager, data_source: &str) -> DbResult<M> {
        let db = manager.get(data_source).await?;
        let binder = Binder {
            manager: manager.clone(),
            data_source: data_source.to_string(),
            db,
            namespace: Namespace::of::<M>(),
        };
        tracing::debug!(
            mapper = std::any::type_name::<M>(),
            ds = %data_source,
            "binding mapper"
        );
        M::bind(&binder).await
    }

    pub fn manager(&self) -> Manager {
        self.manager.clone()
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// The mapper's default connection.
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Bind a nested mapper on `data_source`, or on this mapper's data
    /// source when `None`.
    pub async fn nested<N: Mapper>(&self, data_source: Option<&str>) -> DbResult<N> {
        let ds = data_source.unwrap_or(&self.data_source);
        Binder::bind::<N>(&self.manager, ds).await
    }

    /// Start binding the field `name`.
    pub fn field(&self, name: &str) -> FieldBinder<'_> {
        FieldBinder {
            binder: self,
            name: name.to_string(),
            tags: FieldTags::default(),
        }
    }
}

/// Per-field binding options.
#[derive(Debug)]
#[must_use]
pub struct FieldBinder<'b> {
    binder: &'b Binder,
    name: String,
    tags: FieldTags,
}

impl<'b> FieldBinder<'b> {
    /// Use another connection for this field.
    pub fn ds(mut self, data_source: impl Into<String>) -> Self {
        let ds: String = data_source.into();
        self.tags.ds = (!ds.is_empty()).then_some(ds);
        self
    }

    /// Template name (`*.sql`) or inline SQL.
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        let sql: String = sql.into();
        self.tags.sql = (!sql.is_empty()).then_some(sql);
        self
    }

    pub fn tx(mut self, isolation: IsolationLevel) -> Self {
        self.tags.isolation = Some(isolation);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.tags.read_only = Some(read_only);
        self
    }

    /// Apply a tag string such as `ds:"orders" tx:"ReadCommitted"`. Keys
    /// present in the string override earlier settings.
    pub fn tags(mut self, tag: &str) -> DbResult<Self> {
        let parsed = FieldTags::parse(tag)
            .map_err(|e| DbError::bind(format!("field {}: {e}", self.name)))?;
        self.tags.merge(parsed);
        Ok(self)
    }

    pub fn options(&self) -> TxOptions {
        self.tags.tx_options()
    }

    /// The field's connection: the `ds` override or the mapper's own.
    pub async fn database(&self) -> DbResult<Arc<Database>> {
        match &self.tags.ds {
            Some(ds) if ds != &self.binder.data_source => self.binder.manager.get(ds).await,
            _ => Ok(self.binder.db.clone()),
        }
    }

    async fn binding(&self) -> DbResult<Binding> {
        let db = self.database().await?;
        let namespace = &self.binder.namespace;
        let candidates = match &self.tags.sql {
            None => namespace.candidates(&self.name),
            Some(name) if is_template(name) => vec![name.clone()],
            Some(inline) => {
                let name = namespace.inline_name(&self.name);
                db.add_template(&name, inline).map_err(|e| {
                    DbError::bind(format!("field {}: inline sql: {e}", self.name))
                })?;
                vec![name]
            }
        };
        tracing::trace!(field = %self.name, templates = ?candidates, "bound field");
        Ok(Binding::new(db, candidates))
    }

    pub async fn exec(self) -> DbResult<ExecFn> {
        Ok(ExecFn::new(self.binding().await?))
    }

    pub async fn named_exec(self) -> DbResult<NamedExecFn> {
        Ok(NamedExecFn::new(self.binding().await?))
    }

    /// Transaction-scoped function carrying the field's isolation level and
    /// read-only flag.
    pub async fn transaction(self) -> DbResult<TxFn> {
        let options = self.options();
        Ok(TxFn::new(self.binding().await?, options))
    }

    pub async fn select<T>(self) -> DbResult<SelectFn<T>> {
        Ok(SelectFn::new(self.binding().await?))
    }

    pub async fn named_select<T>(self) -> DbResult<NamedSelectFn<T>> {
        Ok(NamedSelectFn::new(self.binding().await?))
    }

    pub async fn get<T>(self) -> DbResult<GetFn<T>> {
        Ok(GetFn::new(self.binding().await?))
    }

    pub async fn named_get<T>(self) -> DbResult<NamedGetFn<T>> {
        Ok(NamedGetFn::new(self.binding().await?))
    }
}

#[cfg(test)]
mod tests;
