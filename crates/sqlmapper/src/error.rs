//! Error types for sqlmapper

use thiserror::Error;

/// Result type alias for sqlmapper operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for rendering, binding and database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// No dialect (driver) configured
    #[error("driver is nil")]
    NilDriver,

    /// Operation attempted on an unbound handle
    #[error("DB is nil")]
    NilHandle,

    /// Unknown dialect name
    #[error("dialect {0} not found")]
    DialectNotFound(String),

    /// No connection or lazy constructor registered under the name
    #[error("database {name} not found in {manager}")]
    ConnectionNotFound { name: String, manager: String },

    /// A registered constructor failed
    #[error("initialize database {name} error:{source}")]
    Init {
        name: String,
        #[source]
        source: Box<DbError>,
    },

    /// No connector registered for a dialect
    #[error("no connector registered for dialect {0}")]
    NoConnector(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Mapper binding error
    #[error("Bind error: {0}")]
    Bind(String),

    /// Template parse error
    #[error("Template error: {0}")]
    Template(String),

    /// Template execution error
    #[error("Render error: {0}")]
    Render(String),

    /// None of the candidate templates is registered
    #[error("template not found, tried: {}", .candidates.join(", "))]
    TemplateNotFound { candidates: Vec<String> },

    /// A named parameter has no value in the argument
    #[error("missing argument for named parameter '{0}'")]
    MissingArgument(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "postgres")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error reported by a driver implementation
    #[error("Driver error: {0}")]
    Driver(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Feature not supported by the dialect or driver
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Callback failed and the rollback failed too
    #[error("{error} (rollback failed: {rollback})")]
    RollbackFailed {
        error: Box<DbError>,
        rollback: Box<DbError>,
    },

    /// Transaction already committed or rolled back
    #[error("transaction already finished")]
    TxFinished,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error while loading templates or configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a binding error
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    pub(crate) fn init(name: impl Into<String>, source: DbError) -> Self {
        Self::Init {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this error came from an unbound handle
    pub fn is_nil_handle(&self) -> bool {
        matches!(self, Self::NilHandle)
    }

    /// Parse a tokio_postgres error into a more specific DbError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<handlebars::TemplateError> for DbError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::RenderError> for DbError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<glob::PatternError> for DbError {
    fn from(err: glob::PatternError) -> Self {
        Self::Config(err.to_string())
    }
}
