//! # sqlmapper
//!
//! Dialect-aware SQL templates and declarative mapper binding.
//!
//! ## Features
//!
//! - **SQL files first**: `.sql` templates with helpers such as `where`,
//!   `columns`, `setArgs` and `orderBy` that render dialect-correct,
//!   escaped fragments
//! - **Named parameters**: `:name` / `$name` / `@name` rewritten into the
//!   dialect's positional placeholders
//! - **Expression builder**: `select` / `insert` / `update` / `delete` trees
//!   compiled per dialect
//! - **Mappers**: structs of typed bound functions (`SelectFn<User>`,
//!   `ExecFn`, `TxFn`, ...) wired to a connection and a template
//! - **Connection manager**: named, lazily constructed connections that
//!   share template file sets
//!
//! ## Templates
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//!
//! let manager = Manager::new("app");
//! manager.add_template_source(TemplateSource::new("sql").pattern("**/*.sql"));
//! let db = manager.open("Default", "postgres", "postgres://localhost/app").await?;
//!
//! // sql/user/find.sql: SELECT * FROM users{{where this}}
//! let users: Vec<User> = db
//!     .named_select("user/find.sql", &serde_json::json!({"status": "active"}))
//!     .await?;
//!
//! // Plain SQL with named parameters
//! let user: User = db
//!     .named_get("SELECT * FROM users WHERE id = $id", &serde_json::json!({"id": 1}))
//!     .await?;
//! ```
//!
//! ## Expressions
//!
//! ```ignore
//! use sqlmapper::expr::{col, select};
//!
//! let active: Vec<User> = db
//!     .select_expr(select("users").filter(col("status").eq("active")).limit(10))
//!     .await?;
//! ```
//!
//! See [`mapper`] for mapper binding.

pub mod client;
pub mod config;
pub mod database;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod expr;
pub mod manager;
pub mod mapper;
pub mod named;
pub mod prelude;
pub mod render;
pub mod row;
pub mod template;
pub mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use client::GenericClient;
pub use config::{DatabaseConfig, ManagerConfig, TemplateConfig};
pub use database::Database;
pub use dialect::{Dialect, DialectRegistry, LimitStyle, Placeholder};
pub use driver::{Connector, Driver, DriverTransaction, ExecResult};
pub use error::{DbError, DbResult};
pub use manager::{DEFAULT_NAME, Manager};
pub use mapper::{
    Binder, ExecFn, FieldBinder, FieldTags, GetFn, Mapper, NamedExecFn, NamedGetFn,
    NamedSelectFn, Namespace, SelectFn, TxFn,
};
pub use row::Row;
pub use template::{TemplateSet, TemplateSource};
pub use transaction::{IsolationLevel, Tx, TxOptions};
pub use value::Value;

#[cfg(feature = "postgres")]
pub use postgres::{PgConnector, PgDriver, create_pool, create_pool_with_config};

// Re-export for `Value::Json` payloads and template arguments
pub use serde_json::{Value as Json, json};
