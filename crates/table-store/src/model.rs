//! Persisted records.

use chrono::{DateTime, Utc};
use common::{ProfileId, ReservationId, RestaurantId, TableId};
use serde::{Deserialize, Serialize};

/// A restaurant owning zero or more tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    /// Creates a new restaurant with a fresh ID.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: RestaurantId::new(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A reservable seating unit at a restaurant for one date.
///
/// `0 <= num_seats_reserved <= num_seats_available` holds for every
/// committed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub restaurant_id: RestaurantId,
    pub name: Option<String>,
    /// Seat capacity.
    pub num_seats_available: i32,
    /// Seats held by active reservations.
    pub num_seats_reserved: i32,
    /// The instant the table opens.
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    /// Creates a new, unreserved table with a fresh ID.
    pub fn new(
        restaurant_id: RestaurantId,
        name: Option<String>,
        num_seats_available: i32,
        start_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TableId::new(),
            restaurant_id,
            name,
            num_seats_available,
            num_seats_reserved: 0,
            start_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seats that can still be reserved.
    pub fn remaining_seats(&self) -> i32 {
        self.num_seats_available - self.num_seats_reserved
    }

    /// Returns true if the seat counters are within bounds.
    pub fn is_consistent(&self) -> bool {
        self.num_seats_reserved >= 0 && self.num_seats_reserved <= self.num_seats_available
    }
}

/// An active reservation of seats on a table by a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReservation {
    pub id: ReservationId,
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub profile_id: ProfileId,
    pub num_seats: i32,
    /// Copied from the table when the reservation is made.
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReservation {
    /// Creates a reservation of `num_seats` on `table` with a fresh ID.
    pub fn for_table(
        table: &Table,
        profile_id: ProfileId,
        num_seats: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            restaurant_id: table.restaurant_id,
            table_id: table.id,
            profile_id,
            num_seats,
            start_date: table.start_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Archive of a cancelled reservation.
///
/// Keeps the original reservation's ID so the cancellation can be traced
/// back to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReservationCanceled {
    pub id: ReservationId,
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub profile_id: ProfileId,
    pub num_seats: i32,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReservationCanceled {
    /// Builds the cancellation record for `reservation`, stamped at `now`.
    pub fn from_reservation(reservation: &UserReservation, now: DateTime<Utc>) -> Self {
        Self {
            id: reservation.id,
            restaurant_id: reservation.restaurant_id,
            table_id: reservation.table_id,
            profile_id: reservation.profile_id,
            num_seats: reservation.num_seats,
            start_date: reservation.start_date,
            created_at: now,
            updated_at: now,
        }
    }
}
