//! Storage error taxonomy, following the shape of a hand-rolled error enum
//! with manual `Display`/`Error` impls and `From` conversions at the sqlx
//! boundary.

use std::fmt;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed(String),
    QueryFailed(String),
    MigrationFailed(String),
    InvalidConfig(String),
    SerializationError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(msg) => write!(f, "connection failed: {msg}"),
            StorageError::QueryFailed(msg) => write!(f, "query failed: {msg}"),
            StorageError::MigrationFailed(msg) => write!(f, "migration failed: {msg}"),
            StorageError::InvalidConfig(msg) => write!(f, "invalid storage config: {msg}"),
            StorageError::SerializationError(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::QueryFailed("no rows found".to_string()),
            sqlx::Error::Io(io_err) => StorageError::ConnectionFailed(io_err.to_string()),
            other => StorageError::QueryFailed(other.to_string()),
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}
