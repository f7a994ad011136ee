use rusqlite::ErrorCode;
use tertulia_shared::constants::{CODE_NOT_FOUND, CODE_UNIQUE_VIOLATION};
use tertulia_shared::ProviderError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Table name outside the known schema.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column name outside the table's schema.
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    /// Row payload that cannot be stored (not an object, nested values...).
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Request refused by an account rule; `code` is reported to the client.
    #[error("{message}")]
    Rejected { code: &'static str, message: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for ProviderError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation && is_unique_violation(e) =>
            {
                ProviderError::new(CODE_UNIQUE_VIOLATION, err.to_string())
            }
            StoreError::Rejected { code, message } => ProviderError::new(*code, message.clone()),
            StoreError::NotFound => ProviderError::new(CODE_NOT_FOUND, err.to_string()),
            StoreError::UnknownTable(_) => ProviderError::new("unknown_table", err.to_string()),
            StoreError::UnknownColumn { .. } => {
                ProviderError::new("unknown_column", err.to_string())
            }
            _ => ProviderError::raw(err.to_string()),
        }
    }
}

fn is_unique_violation(e: &rusqlite::ffi::Error) -> bool {
    e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
}
