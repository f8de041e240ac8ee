//! Restaurant and table catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{RestaurantId, TableId};
use domain::CreateTable;
use serde::Deserialize;
use table_store::{ReservationStore, Restaurant, Table, TableFilter};

use super::{AppState, parse_id};
use crate::error::{ApiError, codes};

#[derive(Debug, Deserialize)]
pub struct CreateRestaurantBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListTablesQuery {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub start_date: Option<NaiveDate>,
    /// Only tables with free seats.
    #[serde(default)]
    pub available: bool,
    pub limit: Option<usize>,
}

impl ListTablesQuery {
    fn into_filter(self) -> TableFilter {
        let mut filter = TableFilter::new();
        if let Some(date) = self.start_date {
            filter = filter.on_date(date);
        }
        if self.available {
            filter = filter.with_free_seats();
        }
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }
        filter
    }
}

fn restaurant_id(raw: &str) -> Result<RestaurantId, ApiError> {
    parse_id(raw, "restaurant_id", codes::RESTAURANT)
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(codes::RESTAURANT, rejection.body_text())
}

/// POST /restaurants/
#[tracing::instrument(skip(state, body))]
pub async fn create<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateRestaurantBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    let Json(body) = body.map_err(bad_body)?;
    let restaurant = state.catalog.create_restaurant(&body.name).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// GET /restaurants/{restaurant_id}/
#[tracing::instrument(skip(state))]
pub async fn get<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Restaurant>, ApiError> {
    let restaurant = state.catalog.fetch_restaurant(restaurant_id(&id)?).await?;
    Ok(Json(restaurant))
}

/// POST /restaurants/{restaurant_id}/tables/
#[tracing::instrument(skip(state, body))]
pub async fn create_table<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<CreateTable>, JsonRejection>,
) -> Result<(StatusCode, Json<Table>), ApiError> {
    let restaurant_id = restaurant_id(&id)?;
    let Json(input) = body.map_err(bad_body)?;
    let table = state.catalog.create_table(restaurant_id, input).await?;
    Ok((StatusCode::CREATED, Json(table)))
}

/// GET /restaurants/{restaurant_id}/tables/?start_date=YYYY-MM-DD&available=true&limit=N
#[tracing::instrument(skip(state, query))]
pub async fn list_tables<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    query: Result<Query<ListTablesQuery>, QueryRejection>,
) -> Result<Json<Vec<Table>>, ApiError> {
    let restaurant_id = restaurant_id(&id)?;
    let Query(query) =
        query.map_err(|e| ApiError::bad_request(codes::RESTAURANT, e.body_text()))?;
    let tables = state
        .catalog
        .fetch_tables(restaurant_id, query.into_filter())
        .await?;
    Ok(Json(tables))
}

/// GET /restaurants/{restaurant_id}/tables/{table_id}/
#[tracing::instrument(skip(state))]
pub async fn get_table<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, table_id)): Path<(String, String)>,
) -> Result<Json<Table>, ApiError> {
    let restaurant_id = restaurant_id(&id)?;
    let table_id: TableId = parse_id(&table_id, "table_id", codes::RESTAURANT)?;
    let table = state.catalog.fetch_table(restaurant_id, table_id).await?;
    Ok(Json(table))
}
