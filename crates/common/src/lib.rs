//! Shared identifier types for the table reservation service.

mod types;

pub use types::{ProfileId, ReservationId, RestaurantId, TableId};
