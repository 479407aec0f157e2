use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// A unique constraint was violated (duplicate nonce, SK or key ID).
    #[error("Conflict: {0}")]
    Conflict(#[source] rusqlite::Error),

    /// Schema bootstrap failed; the store never became ready.
    #[error("Schema bootstrap failed: {0}")]
    Bootstrap(String),

    /// The store has been closed.
    #[error("Store is closed")]
    Closed,

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hex decoding error.
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),
}

impl From<rusqlite::Error> for StoreError {
    /// Constraint violations get their own variant so callers can tell a
    /// duplicate insert apart from an I/O-level failure.
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::Conflict(err);
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
