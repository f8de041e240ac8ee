//! Reserve, batch reserve, and cancel endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use common::{ReservationId, RestaurantId, TableId};
use domain::{CancelReserveRequest, ReserveRequest};
use serde::Deserialize;
use table_store::{ReservationStore, UserReservation, UserReservationCanceled};

use super::{AppState, parse_id};
use crate::auth::Session;
use crate::error::{ApiError, codes};

/// Body of a single-table reservation.
///
/// A `table_id` field may be present but is ignored; the path decides
/// which table is reserved.
#[derive(Debug, Deserialize)]
pub struct ReserveTableBody {
    pub num_seats_reserved: i32,
}

/// One element of a batch reservation.
#[derive(Debug, Deserialize)]
pub struct ReserveTablesItem {
    pub table_id: TableId,
    pub num_seats_reserved: i32,
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(codes::BAD_DATA, rejection.body_text())
}

/// POST /restaurants/{restaurant_id}/tables/{table_id}/reserve/
#[tracing::instrument(skip(state, session, body))]
pub async fn reserve_table<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((restaurant_id, table_id)): Path<(String, String)>,
    body: Result<Json<ReserveTableBody>, JsonRejection>,
) -> Result<Json<UserReservation>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&restaurant_id, "restaurant_id", codes::BAD_DATA)?;
    let table_id: TableId = parse_id(&table_id, "table_id", codes::BAD_DATA)?;
    let Json(body) = body.map_err(bad_body)?;

    let reservation = state
        .reservations
        .reserve_table(ReserveRequest::new(
            restaurant_id,
            table_id,
            session.profile_id,
            body.num_seats_reserved,
        ))
        .await
        .map_err(ApiError::reserve(codes::RESERVE_TABLE))?;

    Ok(Json(reservation))
}

/// POST /restaurants/{restaurant_id}/tables/reserve/
#[tracing::instrument(skip(state, session, body))]
pub async fn reserve_tables<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path(restaurant_id): Path<String>,
    body: Result<Json<Vec<ReserveTablesItem>>, JsonRejection>,
) -> Result<Json<Vec<UserReservation>>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&restaurant_id, "restaurant_id", codes::BAD_DATA)?;
    let Json(items) = body.map_err(bad_body)?;

    let requests = items
        .into_iter()
        .map(|item| {
            ReserveRequest::new(
                restaurant_id,
                item.table_id,
                session.profile_id,
                item.num_seats_reserved,
            )
        })
        .collect();

    let reservations = state
        .reservations
        .reserve_tables(requests)
        .await
        .map_err(ApiError::reserve(codes::RESERVE_TABLES))?;

    Ok(Json(reservations))
}

/// POST /restaurants/{restaurant_id}/tables/{table_id}/reservations/{user_reservation_id}/cancel/
#[tracing::instrument(skip(state, session))]
pub async fn cancel_reservation<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path((restaurant_id, table_id, reservation_id)): Path<(String, String, String)>,
) -> Result<Json<UserReservationCanceled>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&restaurant_id, "restaurant_id", codes::BAD_DATA)?;
    let table_id: TableId = parse_id(&table_id, "table_id", codes::BAD_DATA)?;
    let reservation_id: ReservationId =
        parse_id(&reservation_id, "user_reservation_id", codes::BAD_DATA)?;

    let canceled = state
        .reservations
        .cancel_reservation(CancelReserveRequest::new(
            restaurant_id,
            table_id,
            reservation_id,
            session.profile_id,
        ))
        .await
        .map_err(ApiError::reserve(codes::CANCEL_RESERVATION))?;

    Ok(Json(canceled))
}
