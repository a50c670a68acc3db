use thiserror::Error;

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A single-row operation matched zero rows.
    #[error("No rows matched {0}")]
    NoRows(String),

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The write was rejected before reaching the backend.
    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    /// The backend cannot perform the requested operation.
    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// The backend is unavailable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded into its domain type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Machine-readable code for callers that branch on the failure kind.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            StoreError::NoRows(_) => Some("no_rows"),
            StoreError::UniqueViolation(_) => Some("unique_violation"),
            StoreError::Unsupported(_) => Some("unsupported"),
            _ => None,
        }
    }

    /// Returns true if a single-row operation found nothing.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, StoreError::NoRows(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NoRows("query".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(
                    db_err
                        .constraint()
                        .map(String::from)
                        .unwrap_or_else(|| db_err.message().to_string()),
                )
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
