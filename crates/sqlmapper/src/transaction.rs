//! Transactions: isolation options, the [`Tx`] handle and scoped execution.
//!
//! [`Database::transaction`](crate::Database::transaction) and
//! [`TxFn`](crate::mapper::TxFn) run a callback inside a transaction:
//!
//! - commit on `Ok(_)`
//! - roll back on `Err(_)`, returning the callback error unchanged
//! - roll back on panic, then resume the panic
//!
//! If the rollback itself fails the result is [`DbError::RollbackFailed`]
//! carrying both errors. A failed commit is reported as-is.

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::driver::{DriverTransaction, ExecResult};
use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::template::TemplateSet;
use crate::value::Value;
use futures_util::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Transaction isolation level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    WriteCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
    Linearizable,
}

impl IsolationLevel {
    /// Parse a level keyword such as `ReadCommitted`. Unknown or empty
    /// keywords map to [`IsolationLevel::Default`].
    pub fn parse_keyword(keyword: &str) -> Self {
        match keyword.trim() {
            "ReadUncommitted" => Self::ReadUncommitted,
            "ReadCommitted" => Self::ReadCommitted,
            "WriteCommitted" => Self::WriteCommitted,
            "RepeatableRead" => Self::RepeatableRead,
            "Snapshot" => Self::Snapshot,
            "Serializable" => Self::Serializable,
            "Linearizable" => Self::Linearizable,
            _ => Self::Default,
        }
    }

    pub fn as_keyword(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::ReadUncommitted => "ReadUncommitted",
            Self::ReadCommitted => "ReadCommitted",
            Self::WriteCommitted => "WriteCommitted",
            Self::RepeatableRead => "RepeatableRead",
            Self::Snapshot => "Snapshot",
            Self::Serializable => "Serializable",
            Self::Linearizable => "Linearizable",
        }
    }

    /// Standard SQL spelling, for levels that have one.
    pub fn sql(self) -> Option<&'static str> {
        match self {
            Self::ReadUncommitted => Some("READ UNCOMMITTED"),
            Self::ReadCommitted => Some("READ COMMITTED"),
            Self::RepeatableRead => Some("REPEATABLE READ"),
            Self::Serializable => Some("SERIALIZABLE"),
            Self::Snapshot => Some("SNAPSHOT"),
            Self::Default | Self::WriteCommitted | Self::Linearizable => None,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_keyword())
    }
}

/// Options passed to `begin`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

struct TxInner {
    tx: Mutex<Option<Box<dyn DriverTransaction>>>,
    dialect: Arc<Dialect>,
    templates: Arc<TemplateSet>,
    candidates: Vec<String>,
    options: TxOptions,
}

impl Drop for TxInner {
    fn drop(&mut self) {
        if self.tx.get_mut().is_some() {
            tracing::warn!(
                isolation = %self.options.isolation,
                "transaction dropped without commit or rollback"
            );
        }
    }
}

/// Handle to an open transaction.
///
/// Cheap to clone; every clone targets the same transaction. Once committed
/// or rolled back, every operation fails with [`DbError::TxFinished`].
#[derive(Clone)]
pub struct Tx {
    inner: Arc<TxInner>,
}

impl std::fmt::Debug for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("dialect", &self.inner.dialect.name())
            .field("options", &self.inner.options)
            .field("templates", &self.inner.candidates)
            .finish()
    }
}

impl Tx {
    pub(crate) fn new(
        tx: Box<dyn DriverTransaction>,
        dialect: Arc<Dialect>,
        templates: Arc<TemplateSet>,
        candidates: Vec<String>,
        options: TxOptions,
    ) -> Self {
        Self {
            inner: Arc::new(TxInner {
                tx: Mutex::new(Some(tx)),
                dialect,
                templates,
                candidates,
                options,
            }),
        }
    }

    pub fn options(&self) -> TxOptions {
        self.inner.options
    }

    /// Template candidates bound by a mapper, empty otherwise.
    pub fn bound_templates(&self) -> &[String] {
        &self.inner.candidates
    }

    pub async fn is_finished(&self) -> bool {
        self.inner.tx.lock().await.is_none()
    }

    pub async fn commit(&self) -> DbResult<()> {
        let tx = self.inner.tx.lock().await.take().ok_or(DbError::TxFinished)?;
        tracing::debug!(target: "sqlmapper::sql", "commit");
        tx.commit().await
    }

    pub async fn rollback(&self) -> DbResult<()> {
        let tx = self.inner.tx.lock().await.take().ok_or(DbError::TxFinished)?;
        tracing::debug!(target: "sqlmapper::sql", "rollback");
        tx.rollback().await
    }

    fn bound(&self) -> DbResult<&str> {
        if self.inner.candidates.is_empty() {
            return Err(DbError::bind("transaction has no bound template"));
        }
        self.inner.templates.resolve(&self.inner.candidates)
    }

    /// Execute the mapper-bound template with positional arguments.
    pub async fn exec_bound(&self, args: &[Value]) -> DbResult<ExecResult> {
        let name = self.bound()?.to_string();
        self.exec(&name, args).await
    }

    /// Execute the mapper-bound template with a named argument.
    pub async fn named_exec_bound<A: Serialize + ?Sized>(&self, arg: &A) -> DbResult<ExecResult> {
        let name = self.bound()?.to_string();
        self.named_exec(&name, arg).await
    }
}

impl GenericClient for Tx {
    fn dialect(&self) -> &Arc<Dialect> {
        &self.inner.dialect
    }

    fn templates(&self) -> &Arc<TemplateSet> {
        &self.inner.templates
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send {
        async move {
            let guard = self.inner.tx.lock().await;
            let tx = guard.as_ref().ok_or(DbError::TxFinished)?;
            tx.execute(sql, args).await
        }
    }

    fn query_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send {
        async move {
            let guard = self.inner.tx.lock().await;
            let tx = guard.as_ref().ok_or(DbError::TxFinished)?;
            tx.query(sql, args).await
        }
    }
}

/// Run `f` inside `tx`, committing or rolling back on its outcome.
pub(crate) async fn scoped<F, Fut, T>(tx: Tx, f: F) -> DbResult<T>
where
    F: FnOnce(Tx) -> Fut + Send,
    Fut: Future<Output = DbResult<T>> + Send,
    T: Send,
{
    let handle = tx.clone();
    let outcome = AssertUnwindSafe(async move { f(handle).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => match tx.commit().await {
            // Already finished by the callback itself.
            Ok(()) | Err(DbError::TxFinished) => Ok(value),
            Err(commit_err) => Err(commit_err),
        },
        Ok(Err(error)) => match tx.rollback().await {
            Ok(()) | Err(DbError::TxFinished) => Err(error),
            Err(rollback) => {
                tracing::error!(error = %error, rollback = %rollback, "rollback failed");
                Err(DbError::RollbackFailed {
                    error: Box::new(error),
                    rollback: Box::new(rollback),
                })
            }
        },
        Err(panic) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(rollback = %rollback, "rollback after panic failed");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
