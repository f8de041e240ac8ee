//! Domain layer for table reservations.
//!
//! - [`ReservationService`] reserves and cancels seats while keeping every
//!   table's reserved counter within its capacity
//! - [`CatalogService`] creates and looks up restaurants and tables

pub mod catalog;
pub mod error;
pub mod reservation;

use chrono::{DateTime, Utc};

pub use catalog::{CatalogService, CreateTable, MAX_SEATS_PER_TABLE};
pub use error::{CatalogError, ReserveError};
pub use reservation::{CancelReserveRequest, ReservationService, ReservationState, ReserveRequest};

/// Source of the current instant used for past-date checks and timestamps.
pub type Clock = fn() -> DateTime<Utc>;
