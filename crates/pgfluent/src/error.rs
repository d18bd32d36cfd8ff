//! Error types for pgfluent

use thiserror::Error;

/// Result type alias for pgfluent operations
pub type OrmResult<T> = Result<T, OrmError>;

/// How loudly an error is reported through the log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable misuse; the query still runs.
    Warning,
    /// The operation was aborted.
    Error,
}

/// Error types for builder and database operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// ORDER BY direction other than `asc`/`desc`
    #[error("Order direction must be \"asc\" or \"desc\", got \"{0}\"")]
    InvalidOrderDirection(String),

    /// Operator outside the supported set
    #[error("Unsupported operator \"{0}\"")]
    InvalidOperator(String),

    /// Comparison operator paired with a NULL value
    #[error("Illegal operator and value combination: \"{operator}\" cannot compare against NULL")]
    InvalidOperatorCombination { operator: String },

    /// Insert attempted on a model without fillable columns
    #[error("No fillable columns declared for table '{0}'")]
    MissingFillableConfiguration(String),

    /// Nothing left to insert after filtering by fillable columns
    #[error("No insertable columns for table '{0}'")]
    NoInsertableColumns(String),

    /// Save attempted without a fetched row or its primary key value
    #[error("No associated record to save in table '{0}'")]
    NoAssociatedRecord(String),

    /// Delete attempted without a key or a fetched row
    #[error("Missing primary key value to delete from table '{0}'")]
    MissingPrimaryKeyForDelete(String),

    /// The driver rejected the statement
    #[error("Statement execution failed: {0}")]
    StatementExecution(String),

    /// No row matched a strict lookup
    #[error("Record not found in table '{0}'")]
    RecordNotFound(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an operator/value combination error
    pub fn invalid_combination(operator: impl Into<String>) -> Self {
        Self::InvalidOperatorCombination {
            operator: operator.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Severity used when the error is reported through a [`LogSink`](crate::LogSink).
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidOrderDirection(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Convert a driver error, keeping the server message when there is one.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            return Self::StatementExecution(format!(
                "{} ({})",
                db_err.message(),
                db_err.code().code()
            ));
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::StatementExecution(err.to_string())
    }
}

impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::from_db_error(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
