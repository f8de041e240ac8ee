//! Reservation lifecycle.

/// The state of a reservation that exists in the store.
///
/// State transitions:
/// ```text
/// (none) ──reserve──► Active ──cancel──► Cancelled
/// ```
///
/// A reservation that was never made has no state. `Cancelled` is terminal;
/// the active row is deleted on cancellation, which is what prevents a
/// second cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationState {
    /// Seats are held on the table.
    Active,

    /// The reservation was cancelled.
    Cancelled,
}
