//! A named connection: driver, dialect and template set.

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::driver::{Driver, ExecResult};
use crate::error::DbResult;
use crate::row::Row;
use crate::template::{TemplateSet, TemplateSource};
use crate::transaction::{self, Tx, TxOptions};
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;

/// One live connection with its own template set.
///
/// A `Database` always has exactly one dialect; the template helpers are
/// bound to it.
pub struct Database {
    name: String,
    driver: Arc<dyn Driver>,
    dialect: Arc<Dialect>,
    templates: Arc<TemplateSet>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Wrap a driver. The built-in templates are installed.
    pub fn new(driver: Arc<dyn Driver>, dialect: Arc<Dialect>) -> DbResult<Self> {
        let templates = TemplateSet::with_builtin(dialect.clone())?;
        Ok(Self {
            name: String::new(),
            driver,
            dialect,
            templates: Arc::new(templates),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Logical name given by the manager, empty for unregistered handles.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Register one template (e.g. inline SQL from a mapper).
    pub fn add_template(&self, name: &str, source: &str) -> DbResult<()> {
        self.templates.register(name, source)
    }

    /// Load a template file set.
    pub fn load_templates(&self, source: &TemplateSource) -> DbResult<usize> {
        self.templates.load(source)
    }

    /// Replace every template.
    pub fn replace_templates<I, N, S>(&self, templates: I) -> DbResult<()>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        self.templates.replace(templates)
    }

    /// Begin a transaction under manual control.
    pub async fn begin(&self, options: TxOptions) -> DbResult<Tx> {
        self.begin_bound(options, Vec::new()).await
    }

    pub(crate) async fn begin_bound(
        &self,
        options: TxOptions,
        candidates: Vec<String>,
    ) -> DbResult<Tx> {
        tracing::debug!(
            target: "sqlmapper::sql",
            db = %self.name,
            isolation = %options.isolation,
            read_only = options.read_only,
            "begin"
        );
        let tx = self.driver.begin(&options).await?;
        Ok(Tx::new(
            tx,
            self.dialect.clone(),
            self.templates.clone(),
            candidates,
            options,
        ))
    }

    /// Run `f` in a transaction: commit on `Ok`, roll back on `Err` or
    /// panic.
    ///
    /// ```ignore
    /// db.transaction(TxOptions::default(), |tx| async move {
    ///     tx.exec("UPDATE accounts SET balance = balance - ? WHERE id = ?", &args![100, 1]).await?;
    ///     tx.exec("UPDATE accounts SET balance = balance + ? WHERE id = ?", &args![100, 2]).await?;
    ///     Ok(())
    /// })
    /// .await?;
    /// ```
    pub async fn transaction<F, Fut, T>(&self, options: TxOptions, f: F) -> DbResult<T>
    where
        F: FnOnce(Tx) -> Fut + Send,
        Fut: Future<Output = DbResult<T>> + Send,
        T: Send,
    {
        let tx = self.begin(options).await?;
        transaction::scoped(tx, f).await
    }

    pub(crate) async fn transaction_bound<F, Fut, T>(
        &self,
        options: TxOptions,
        candidates: Vec<String>,
        f: F,
    ) -> DbResult<T>
    where
        F: FnOnce(Tx) -> Fut + Send,
        Fut: Future<Output = DbResult<T>> + Send,
        T: Send,
    {
        let tx = self.begin_bound(options, candidates).await?;
        transaction::scoped(tx, f).await
    }

    /// Close the underlying driver.
    pub async fn close(&self) -> DbResult<()> {
        tracing::info!(db = %self.name, "closing database");
        self.driver.close().await
    }
}

impl GenericClient for Database {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    fn templates(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send {
        async move { self.driver.execute(sql, args).await }
    }

    fn query_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send {
        async move { self.driver.query(sql, args).await }
    }
}
