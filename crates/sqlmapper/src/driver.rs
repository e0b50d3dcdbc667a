//! Database driver seam.
//!
//! The crate renders SQL and binds mappers; talking to a database is left to
//! a [`Driver`]. A PostgreSQL implementation ships behind the `postgres`
//! feature, and tests use in-memory drivers.

use crate::error::DbResult;
use crate::row::Row;
use crate::transaction::TxOptions;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a statement that returns no rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A connection (usually a pool) that runs positional SQL.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Run a statement and report affected rows.
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult>;

    /// Run a query and collect every row.
    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>>;

    /// Start a transaction.
    async fn begin(&self, options: &TxOptions) -> DbResult<Box<dyn DriverTransaction>>;

    /// Release resources. Called on manager shutdown.
    async fn close(&self) -> DbResult<()> {
        Ok(())
    }
}

/// An open transaction. `commit` and `rollback` consume it.
#[async_trait]
pub trait DriverTransaction: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult>;

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Opens drivers from a DSN for one dialect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, dsn: &str) -> DbResult<Arc<dyn Driver>>;
}
