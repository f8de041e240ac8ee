//! Reservation service enforcing seat-count invariants.

use chrono::Utc;
use common::ReservationId;
use table_store::{
    ReservationStore, StoreTransaction, Table, UserReservation, UserReservationCanceled,
};

use crate::Clock;
use crate::error::ReserveError;

use super::{CancelReserveRequest, ReservationState, ReserveRequest};

/// Service for reserving and cancelling table seats.
///
/// Every operation runs inside one store transaction. The table row is
/// locked before availability is checked, so concurrent requests for the
/// same table are serialized and `num_seats_reserved` never exceeds
/// `num_seats_available`. Any failure drops the transaction, rolling back
/// every write made for the request. Nothing is retried.
pub struct ReservationService<S: ReservationStore> {
    store: S,
    clock: Clock,
}

impl<S: ReservationStore> ReservationService<S> {
    /// Creates a new reservation service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    /// Replaces the source of the current time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reserves seats on a single table.
    ///
    /// Fails with `NotFound` if the table does not exist, `InvalidState` if
    /// the table's start date is in the past, and `CapacityExceeded` if
    /// fewer seats remain than requested.
    #[tracing::instrument(
        skip(self, req),
        fields(
            restaurant_id = %req.restaurant_id,
            table_id = %req.table_id,
            seats = req.num_seats_reserved,
        )
    )]
    pub async fn reserve_table(&self, req: ReserveRequest) -> Result<UserReservation, ReserveError> {
        let result: Result<UserReservation, ReserveError> = async {
            validate_seats(&req)?;

            let mut tx = self.store.begin().await?;
            let reservation = reserve_in(tx.as_mut(), &req, self.clock).await?;
            tx.commit().await?;
            Ok(reservation)
        }
        .await;

        match &result {
            Ok(reservation) => record_reserved(reservation),
            Err(e) => record_rejected("reserve_table", e),
        }
        result
    }

    /// Reserves seats on several tables as one unit.
    ///
    /// Requests are applied in order within a single transaction, so each
    /// sees the seats taken by the ones before it. The first failure aborts
    /// the batch and nothing from it is committed.
    #[tracing::instrument(skip(self, reqs), fields(count = reqs.len()))]
    pub async fn reserve_tables(
        &self,
        reqs: Vec<ReserveRequest>,
    ) -> Result<Vec<UserReservation>, ReserveError> {
        if reqs.is_empty() {
            return Ok(Vec::new());
        }

        let result: Result<Vec<UserReservation>, ReserveError> = async {
            let mut tx = self.store.begin().await?;
            let mut reservations = Vec::with_capacity(reqs.len());

            for req in &reqs {
                validate_seats(req)?;
                reservations.push(reserve_in(tx.as_mut(), req, self.clock).await?);
            }

            tx.commit().await?;
            Ok(reservations)
        }
        .await;

        match &result {
            Ok(reservations) => reservations.iter().for_each(record_reserved),
            Err(e) => record_rejected("reserve_tables", e),
        }
        result
    }

    /// Cancels an active reservation and releases its seats.
    ///
    /// The active reservation is deleted and archived under its original
    /// ID, and the table's reserved counter is decremented by the
    /// reservation's seats, all in one transaction. A reservation that is
    /// already cancelled, never existed, or belongs to a different table
    /// yields `NotFound`.
    #[tracing::instrument(
        skip(self, req),
        fields(
            restaurant_id = %req.restaurant_id,
            table_id = %req.table_id,
            reservation_id = %req.user_reservation_id,
        )
    )]
    pub async fn cancel_reservation(
        &self,
        req: CancelReserveRequest,
    ) -> Result<UserReservationCanceled, ReserveError> {
        let result: Result<UserReservationCanceled, ReserveError> = async {
            let mut tx = self.store.begin().await?;
            let canceled = cancel_in(tx.as_mut(), &req, self.clock).await?;
            tx.commit().await?;
            Ok(canceled)
        }
        .await;

        match &result {
            Ok(canceled) => {
                metrics::counter!("reservations_canceled_total").increment(1);
                tracing::info!(
                    reservation_id = %canceled.id,
                    profile_id = %req.profile_id,
                    seats = canceled.num_seats,
                    "reservation cancelled"
                );
            }
            Err(e) => record_rejected("cancel_reservation", e),
        }
        result
    }

    /// Reports where a reservation is in its lifecycle.
    ///
    /// Returns None if no reservation with this ID was ever made.
    pub async fn reservation_state(
        &self,
        id: ReservationId,
    ) -> Result<Option<ReservationState>, ReserveError> {
        if self.store.fetch_user_reservation(id).await?.is_some() {
            return Ok(Some(ReservationState::Active));
        }
        if self.store.fetch_user_reservation_canceled(id).await?.is_some() {
            return Ok(Some(ReservationState::Cancelled));
        }
        Ok(None)
    }
}

fn validate_seats(req: &ReserveRequest) -> Result<(), ReserveError> {
    if req.num_seats_reserved < 1 {
        return Err(ReserveError::InvalidRequest(format!(
            "num_seats_reserved must be at least 1, got {}",
            req.num_seats_reserved
        )));
    }
    Ok(())
}

async fn reserve_in(
    tx: &mut dyn StoreTransaction,
    req: &ReserveRequest,
    clock: Clock,
) -> Result<UserReservation, ReserveError> {
    let table = tx
        .fetch_table_for_update(req.restaurant_id, req.table_id)
        .await?
        .ok_or_else(|| ReserveError::not_found("table", req.table_id))?;

    // Read after the lock is held; the wait may have crossed the start date.
    let now = clock();

    // A start date equal to now is still reservable.
    if table.start_date < now {
        return Err(ReserveError::InvalidState(
            "cannot reserve a table in the past".to_string(),
        ));
    }

    let available = table.remaining_seats();
    if req.num_seats_reserved > available {
        return Err(ReserveError::CapacityExceeded {
            requested: req.num_seats_reserved,
            available,
        });
    }

    let reservation = tx
        .create_user_reservation(UserReservation::for_table(
            &table,
            req.profile_id,
            req.num_seats_reserved,
            now,
        ))
        .await?;

    let reserved = table.num_seats_reserved + reservation.num_seats;
    tx.update_table(Table {
        num_seats_reserved: reserved,
        updated_at: now,
        ..table
    })
    .await?;

    Ok(reservation)
}

async fn cancel_in(
    tx: &mut dyn StoreTransaction,
    req: &CancelReserveRequest,
    clock: Clock,
) -> Result<UserReservationCanceled, ReserveError> {
    let reservation = tx
        .fetch_user_reservation(req.user_reservation_id)
        .await?
        .filter(|r| r.restaurant_id == req.restaurant_id && r.table_id == req.table_id)
        .ok_or_else(|| ReserveError::not_found("reservation", req.user_reservation_id))?;

    let table = tx
        .fetch_table_for_update(req.restaurant_id, req.table_id)
        .await?
        .ok_or_else(|| ReserveError::not_found("table", req.table_id))?;
    let now = clock();

    // Zero rows deleted means a concurrent cancel got there first.
    if !tx.delete_user_reservation(reservation.id).await? {
        return Err(ReserveError::not_found("reservation", reservation.id));
    }

    let canceled = tx
        .create_user_reservation_canceled(UserReservationCanceled::from_reservation(
            &reservation,
            now,
        ))
        .await?;

    let reserved = table.num_seats_reserved - reservation.num_seats;
    if reserved < 0 {
        return Err(ReserveError::InconsistentTable {
            table_id: table.id,
            reserved: table.num_seats_reserved,
            releasing: reservation.num_seats,
        });
    }

    tx.update_table(Table {
        num_seats_reserved: reserved,
        updated_at: now,
        ..table
    })
    .await?;

    Ok(canceled)
}

fn record_reserved(reservation: &UserReservation) {
    metrics::counter!("reservations_created_total").increment(1);
    metrics::histogram!("reservation_seats").record(f64::from(reservation.num_seats));
    tracing::info!(
        reservation_id = %reservation.id,
        table_id = %reservation.table_id,
        profile_id = %reservation.profile_id,
        seats = reservation.num_seats,
        "table reserved"
    );
}

fn record_rejected(operation: &'static str, err: &ReserveError) {
    metrics::counter!(
        "reservations_rejected_total",
        "operation" => operation,
        "reason" => err.reason()
    )
    .increment(1);

    match err {
        ReserveError::Internal(_) | ReserveError::InconsistentTable { .. } => {
            tracing::error!(operation, error = %err, "reservation transaction failed");
        }
        _ => tracing::warn!(operation, error = %err, "reservation rejected"),
    }
}
