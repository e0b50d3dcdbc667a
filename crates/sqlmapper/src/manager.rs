//! Named connections and their template sources.
//!
//! A [`Manager`] maps logical names to connections. A name is either ready
//! (connection present) or lazy (constructor pending). Lazy names are built
//! at most once: the first `get` runs the constructor while concurrent
//! callers wait on the slot, then everyone shares the same connection.
//!
//! ```ignore
//! let manager = Manager::new("app");
//! manager.set_lazy("orders", |m| async move {
//!     m.connect(Dialect::postgres(), "postgres://localhost/orders").await
//! });
//! let db = manager.get("orders").await?;
//! ```

use crate::database::Database;
use crate::dialect::{Dialect, DialectRegistry};
use crate::driver::{Connector, Driver};
use crate::error::{DbError, DbResult};
use crate::mapper::{Binder, Mapper};
use crate::template::TemplateSource;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Name of [`Manager::default`] and of the connection opened by
/// [`Manager::open_default`].
pub const DEFAULT_NAME: &str = "Default";

/// Deferred connection constructor.
pub type Constructor = Box<dyn FnOnce(Manager) -> BoxFuture<'static, DbResult<Database>> + Send>;

struct Slot {
    db: OnceLock<Arc<Database>>,
    init: tokio::sync::Mutex<Option<Constructor>>,
}

impl Slot {
    fn ready(db: Arc<Database>) -> Self {
        Self {
            db: OnceLock::from(db),
            init: tokio::sync::Mutex::new(None),
        }
    }

    fn lazy(ctor: Constructor) -> Self {
        Self {
            db: OnceLock::new(),
            init: tokio::sync::Mutex::new(Some(ctor)),
        }
    }
}

struct Inner {
    name: String,
    default_dialect: RwLock<Option<Arc<Dialect>>>,
    dialects: DialectRegistry,
    connectors: RwLock<HashMap<String, Arc<dyn Connector>>>,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    template_sources: RwLock<Vec<TemplateSource>>,
}

/// Connection and template manager.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("name", &self.inner.name)
            .field("databases", &self.names())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "db[{}]", self.inner.name)
    }
}

impl Default for Manager {
    /// A manager named `Default` with MySQL as its default dialect.
    fn default() -> Self {
        Self::new(DEFAULT_NAME)
    }
}

impl Manager {
    /// New manager with MySQL as the default dialect.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_dialect(name, Some(Dialect::mysql()))
    }

    /// New manager with an explicit default dialect (or none).
    pub fn with_dialect(name: impl Into<String>, dialect: Option<Arc<Dialect>>) -> Self {
        let manager = Self {
            inner: Arc::new(Inner {
                name: name.into(),
                default_dialect: RwLock::new(dialect),
                dialects: DialectRegistry::default(),
                connectors: RwLock::new(HashMap::new()),
                slots: RwLock::new(HashMap::new()),
                template_sources: RwLock::new(Vec::new()),
            }),
        };
        #[cfg(feature = "postgres")]
        manager.register_connector("postgres", crate::postgres::PgConnector::default());
        manager
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registered names, ready or lazy, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn slot(&self, name: &str) -> Option<Arc<Slot>> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn not_found(&self, name: &str) -> DbError {
        DbError::ConnectionNotFound {
            name: name.to_string(),
            manager: self.inner.name.clone(),
        }
    }

    /// Look a connection up, constructing it on first use if it was
    /// registered lazily.
    ///
    /// A failing constructor is consumed: its error comes back as
    /// [`DbError::Init`] and later calls report
    /// [`DbError::ConnectionNotFound`].
    pub async fn get(&self, name: &str) -> DbResult<Arc<Database>> {
        let slot = self.slot(name).ok_or_else(|| self.not_found(name))?;
        if let Some(db) = slot.db.get() {
            return Ok(db.clone());
        }

        let mut init = slot.init.lock().await;
        if let Some(db) = slot.db.get() {
            return Ok(db.clone());
        }
        let ctor = init.take().ok_or_else(|| self.not_found(name))?;

        tracing::info!(manager = %self.inner.name, db = %name, "initializing database");
        match ctor(self.clone()).await {
            Ok(db) => {
                let db = Arc::new(db.with_name(name));
                let db = slot.db.get_or_init(|| db).clone();
                Ok(db)
            }
            Err(err) => {
                let mut slots = self
                    .inner
                    .slots
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if slots.get(name).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    slots.remove(name);
                }
                tracing::warn!(db = %name, error = %err, "database constructor failed");
                Err(DbError::init(name, err))
            }
        }
    }

    /// Whether `name` holds a ready connection. Lazy entries that have not
    /// been constructed yet do not count.
    pub fn exists(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|slot| slot.db.get().is_some())
    }

    /// Register a ready connection, replacing whatever `name` held.
    pub fn set(&self, name: &str, db: Database) -> Arc<Database> {
        let db = Arc::new(db.with_name(name));
        self.inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(Slot::ready(db.clone())));
        db
    }

    /// Register a constructor that runs on the first [`get`](Self::get).
    ///
    /// Ignored when `name` already holds a ready connection.
    pub fn set_lazy<F, Fut>(&self, name: &str, ctor: F)
    where
        F: FnOnce(Manager) -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<Database>> + Send + 'static,
    {
        let ctor: Constructor = Box::new(move |m: Manager| ctor(m).boxed());
        let mut slots = self
            .inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slots.get(name).is_some_and(|s| s.db.get().is_some()) {
            tracing::warn!(db = %name, "database already open, lazy registration ignored");
            return;
        }
        slots.insert(name.to_string(), Arc::new(Slot::lazy(ctor)));
    }

    /// Run `ctor` now and register its connection under `name`.
    pub async fn open_with_fn<F, Fut>(&self, name: &str, ctor: F) -> DbResult<Arc<Database>>
    where
        F: FnOnce(Manager) -> Fut,
        Fut: Future<Output = DbResult<Database>>,
    {
        let db = ctor(self.clone()).await?;
        Ok(self.set(name, db))
    }

    /// Open `dsn` with the named dialect and register it, or return the
    /// connection already registered under `name`.
    pub async fn open(&self, name: &str, dialect: &str, dsn: &str) -> DbResult<Arc<Database>> {
        if self.exists(name) {
            return self.get(name).await;
        }
        let dialect = self.inner.dialects.lookup(dialect)?;
        let db = self.connect(dialect, dsn).await?;
        Ok(self.set(name, db))
    }

    /// [`open`](Self::open) under [`DEFAULT_NAME`].
    pub async fn open_default(&self, dialect: &str, dsn: &str) -> DbResult<Arc<Database>> {
        self.open(DEFAULT_NAME, dialect, dsn).await
    }

    /// Open an unregistered connection, using the default dialect when
    /// `dialect` is `None`.
    pub async fn open_with(&self, dialect: Option<Arc<Dialect>>, dsn: &str) -> DbResult<Database> {
        let dialect = match dialect {
            Some(dialect) => dialect,
            None => self.default_dialect()?,
        };
        self.connect(dialect, dsn).await
    }

    /// Connect through the connector registered for `dialect`.
    pub async fn connect(&self, dialect: Arc<Dialect>, dsn: &str) -> DbResult<Database> {
        let connector = self
            .inner
            .connectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dialect.name())
            .cloned()
            .ok_or_else(|| DbError::NoConnector(dialect.name().to_string()))?;
        tracing::info!(manager = %self.inner.name, dialect = %dialect.name(), "opening database");
        let driver = connector.connect(dsn).await?;
        self.attach(driver, dialect)
    }

    /// Wrap a driver into a connection carrying the built-in templates and
    /// every registered template source.
    pub fn attach(&self, driver: Arc<dyn Driver>, dialect: Arc<Dialect>) -> DbResult<Database> {
        let db = Database::new(driver, dialect)?;
        let sources = self
            .inner
            .template_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for source in &sources {
            db.load_templates(source)?;
        }
        Ok(db)
    }

    /// Default dialect, [`DbError::NilDriver`] when unset.
    pub fn default_dialect(&self) -> DbResult<Arc<Dialect>> {
        self.inner
            .default_dialect
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DbError::NilDriver)
    }

    pub fn set_default_dialect(&self, dialect: Arc<Dialect>) {
        *self
            .inner
            .default_dialect
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(dialect);
    }

    pub fn dialects(&self) -> &DialectRegistry {
        &self.inner.dialects
    }

    pub fn register_dialect(&self, dialect: Dialect) -> Arc<Dialect> {
        self.inner.dialects.register(dialect)
    }

    /// Register the connector used for connections of `dialect`.
    pub fn register_connector(&self, dialect: &str, connector: impl Connector) {
        self.inner
            .connectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dialect.to_string(), Arc::new(connector));
    }

    /// Add a template file set for connections opened from now on.
    pub fn add_template_source(&self, source: TemplateSource) {
        self.inner
            .template_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source);
    }

    pub fn clear_template_sources(&self) {
        self.inner
            .template_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn template_sources(&self) -> Vec<TemplateSource> {
        self.inner
            .template_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bind mapper `M` against the connection `data_source`.
    pub async fn bind<M: Mapper>(&self, data_source: &str) -> DbResult<M> {
        Binder::bind::<M>(self, data_source).await
    }

    /// Close every ready connection and forget all names.
    ///
    /// Every connection is closed; the first close error is returned.
    pub async fn shutdown(&self) -> DbResult<()> {
        let slots: Vec<(String, Arc<Slot>)> = self
            .inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut first_err = None;
        for (name, slot) in slots {
            let Some(db) = slot.db.get() else {
                continue;
            };
            if let Err(err) = db.close().await {
                tracing::warn!(db = %name, error = %err, "close failed");
                first_err.get_or_insert(err);
            }
        }
        tracing::info!(manager = %self.inner.name, "shutdown");
        first_err.map_or(Ok(()), Err)
    }
}
