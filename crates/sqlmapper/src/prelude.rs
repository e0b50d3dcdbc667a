//! Convenient imports for typical `sqlmapper` usage.
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//! ```

pub use crate::{
    Binder, Database, DbError, DbResult, Dialect, ExecFn, GenericClient, GetFn, IsolationLevel,
    Manager, Mapper, NamedExecFn, NamedGetFn, NamedSelectFn, Row, SelectFn, TemplateSource, Tx,
    TxFn, TxOptions, Value, args,
};

pub use crate::expr::{col, delete, insert, select, update};

#[cfg(feature = "postgres")]
pub use crate::{PgDriver, create_pool};
