//! Inputs to the reservation service.

use common::{ProfileId, ReservationId, RestaurantId, TableId};

/// Request to reserve seats on one table.
///
/// `profile_id` comes from the caller's authenticated session, never from
/// the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub profile_id: ProfileId,
    pub num_seats_reserved: i32,
}

impl ReserveRequest {
    /// Creates a new reserve request.
    pub fn new(
        restaurant_id: RestaurantId,
        table_id: TableId,
        profile_id: ProfileId,
        num_seats_reserved: i32,
    ) -> Self {
        Self {
            restaurant_id,
            table_id,
            profile_id,
            num_seats_reserved,
        }
    }
}

/// Request to cancel an active reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReserveRequest {
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub user_reservation_id: ReservationId,
    pub profile_id: ProfileId,
}

impl CancelReserveRequest {
    /// Creates a new cancel request.
    pub fn new(
        restaurant_id: RestaurantId,
        table_id: TableId,
        user_reservation_id: ReservationId,
        profile_id: ProfileId,
    ) -> Self {
        Self {
            restaurant_id,
            table_id,
            user_reservation_id,
            profile_id,
        }
    }
}
