//! HTTP handlers.

pub mod health;
pub mod metrics;
pub mod reservations;
pub mod restaurants;

use std::str::FromStr;

use domain::{CatalogService, ReservationService};
use table_store::ReservationStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ReservationStore> {
    pub reservations: ReservationService<S>,
    pub catalog: CatalogService<S>,
}

impl<S: ReservationStore + Clone> AppState<S> {
    /// Builds both services over one store.
    pub fn new(store: S) -> Self {
        Self {
            reservations: ReservationService::new(store.clone()),
            catalog: CatalogService::new(store),
        }
    }
}

/// Parses a path segment into a typed ID, reporting failures under `code`.
pub(crate) fn parse_id<T: FromStr>(
    raw: &str,
    name: &str,
    code: &'static str,
) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(code, format!("invalid {name}: {raw:?}")))
}
