//! Table reservation: reserve, batch reserve, cancel.

mod requests;
mod service;
mod state;

pub use requests::{CancelReserveRequest, ReserveRequest};
pub use service::ReservationService;
pub use state::ReservationState;
