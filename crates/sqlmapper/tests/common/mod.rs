//! In-memory driver shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlmapper::{
    Connector, Database, DbError, DbResult, Dialect, Driver, DriverTransaction, ExecResult, Row,
    TxOptions, Value,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub kind: &'static str,
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    /// Result sets handed out by `query`, one per call; empty when exhausted.
    pub results: VecDeque<Vec<Row>>,
    pub begins: Vec<TxOptions>,
    pub commits: usize,
    pub rollbacks: usize,
    pub fail_execute: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub closed: bool,
}

/// Records every statement and replays canned rows.
#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state.lock().unwrap().results.push_back(rows);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no statement recorded")
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn begins(&self) -> Vec<TxOptions> {
        self.state.lock().unwrap().begins.clone()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn set(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn record(&self, kind: &'static str, sql: &str, args: &[Value]) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            kind,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        if state.fail_execute && kind.ends_with("exec") {
            return Err(DbError::driver("execute failed"));
        }
        Ok(())
    }

    fn next_rows(&self) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .results
            .pop_front()
            .unwrap_or_default()
    }

    /// Wrap into a connection with the built-in templates.
    pub fn database(&self, dialect: Arc<Dialect>) -> Database {
        Database::new(Arc::new(self.clone()), dialect).unwrap()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
        self.record("exec", sql, args)?;
        Ok(ExecResult::new(1))
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        self.record("query", sql, args)?;
        Ok(self.next_rows())
    }

    async fn begin(&self, options: &TxOptions) -> DbResult<Box<dyn DriverTransaction>> {
        self.state.lock().unwrap().begins.push(*options);
        Ok(Box::new(MockTx {
            driver: self.clone(),
        }))
    }

    async fn close(&self) -> DbResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

pub struct MockTx {
    driver: MockDriver,
}

#[async_trait]
impl DriverTransaction for MockTx {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
        self.driver.record("tx exec", sql, args)?;
        Ok(ExecResult::new(1))
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        self.driver.record("tx query", sql, args)?;
        Ok(self.driver.next_rows())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let mut state = self.driver.state.lock().unwrap();
        state.commits += 1;
        if state.fail_commit {
            return Err(DbError::driver("commit failed"));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let mut state = self.driver.state.lock().unwrap();
        state.rollbacks += 1;
        if state.fail_rollback {
            return Err(DbError::driver("rollback failed"));
        }
        Ok(())
    }
}

/// Hands out one shared [`MockDriver`] and counts connects.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub driver: MockDriver,
    pub connects: Arc<AtomicUsize>,
    pub dsns: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, dsn: &str) -> DbResult<Arc<dyn Driver>> {
        if dsn.is_empty() {
            return Err(DbError::Connection("empty dsn".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.dsns.lock().unwrap().push(dsn.to_string());
        Ok(Arc::new(self.driver.clone()))
    }
}
