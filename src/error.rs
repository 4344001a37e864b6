//! Error types for database operations

use serde::Serialize;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect or authenticate to the database server
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Query kind not permitted for the invoked operation
    #[error("Rejected query: {0}")]
    RejectedQuery(String),

    /// No database given and no default database configured
    #[error("No database selected: {0}")]
    MissingDatabase(String),

    /// Catalog lookup returned nothing for the table
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// No free connection became available within the acquire timeout
    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    /// Write failed inside a transaction and was rolled back
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    /// Pool was already closed
    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    /// Identifier failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Operation exceeded its configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// SQL query execution failed
    #[error("Query error: {0}")]
    QueryError(String),

    /// sqlx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Serializable error classification carried in failure payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ConnectionError,
    RejectedQuery,
    MissingDatabase,
    TableNotFound,
    PoolExhausted,
    TransactionFailure,
    ShutdownError,
    InvalidIdentifier,
    Timeout,
    QueryError,
}

impl DatabaseError {
    /// Classify the error for callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionError(_) => ErrorKind::ConnectionError,
            Self::RejectedQuery(_) => ErrorKind::RejectedQuery,
            Self::MissingDatabase(_) => ErrorKind::MissingDatabase,
            Self::TableNotFound(_) => ErrorKind::TableNotFound,
            Self::PoolExhausted(_) => ErrorKind::PoolExhausted,
            Self::TransactionFailure(_) => ErrorKind::TransactionFailure,
            Self::ShutdownError(_) => ErrorKind::ShutdownError,
            Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::QueryError(_) => ErrorKind::QueryError,
            Self::Sqlx(err) => classify_sqlx_error(err),
        }
    }

    /// Map a sqlx error raised while opening a pool
    ///
    /// Anything that is not pool exhaustion is reported as a connection
    /// failure: unreachable host, TLS or protocol trouble, rejected
    /// credentials.
    pub fn from_connect(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted(
                "timed out waiting for a connection while opening the pool".to_string(),
            ),
            other => Self::ConnectionError(other.to_string()),
        }
    }

    /// Map a sqlx error raised while running a statement
    pub fn from_query(err: sqlx::Error, operation: &str) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted(format!(
                "{}: no free connection within the acquire timeout",
                operation
            )),
            sqlx::Error::PoolClosed => {
                Self::ConnectionError(format!("{}: connection pool closed", operation))
            }
            sqlx::Error::Io(io_err) => {
                Self::ConnectionError(format!("{}: {}", operation, io_err))
            }
            sqlx::Error::Tls(tls_err) => {
                Self::ConnectionError(format!("{}: TLS error: {}", operation, tls_err))
            }
            other => Self::QueryError(format!("{}: {}", operation, other)),
        }
    }
}

fn classify_sqlx_error(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut => ErrorKind::PoolExhausted,
        sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => ErrorKind::ConnectionError,
        _ => ErrorKind::QueryError,
    }
}
