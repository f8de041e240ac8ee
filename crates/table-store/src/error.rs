use thiserror::Error;

/// Errors that can occur when interacting with the reservation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was violated, e.g. a reservation ID was inserted twice.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A row-level constraint rejected the write (seat bounds, foreign keys).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// An update or delete targeted a row that does not exist.
    #[error("{entity} not found: {id}")]
    MissingRow { entity: &'static str, id: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A failure injected by the in-memory store.
    #[error("Injected failure: {0}")]
    Injected(&'static str),
}

impl StoreError {
    pub(crate) fn missing(entity: &'static str, id: impl ToString) -> Self {
        StoreError::MissingRow {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
