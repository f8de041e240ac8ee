//! Domain error types.

use common::TableId;
use table_store::StoreError;
use thiserror::Error;

/// Errors that can occur while reserving or cancelling tables.
#[derive(Debug, Error)]
pub enum ReserveError {
    /// The table or reservation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The table cannot be reserved in its current state.
    #[error("{0}")]
    InvalidState(String),

    /// Fewer seats remain than were requested.
    #[error("not enough seats available: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Releasing seats would push the table's reserved counter below zero.
    #[error(
        "table {table_id} holds {reserved} reserved seats, cannot release {releasing}"
    )]
    InconsistentTable {
        table_id: TableId,
        reserved: i32,
        releasing: i32,
    },

    /// The store failed to begin, execute, or commit the transaction.
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

impl ReserveError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ReserveError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReserveError::NotFound { .. })
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ReserveError::NotFound { .. } => "not_found",
            ReserveError::InvalidState(_) => "invalid_state",
            ReserveError::CapacityExceeded { .. } => "capacity_exceeded",
            ReserveError::InvalidRequest(_) => "invalid_request",
            ReserveError::InconsistentTable { .. } | ReserveError::Internal(_) => "internal",
        }
    }
}

/// Errors that can occur while managing restaurants and tables.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The restaurant or table does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An error occurred in the store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
