//! HTTP API server for table reservations.
//!
//! Exposes reserve, batch reserve, and cancel endpoints plus the restaurant
//! and table catalog, behind a bearer-token session. Requests are traced
//! with `tracing` and counted with Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use table_store::ReservationStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::SessionKeys;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ReservationStore + 'static>(
    state: Arc<AppState<S>>,
    session_keys: Arc<SessionKeys>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let authenticated = Router::new()
        .route("/restaurants/", post(routes::restaurants::create::<S>))
        .route("/restaurants/{restaurant_id}/", get(routes::restaurants::get::<S>))
        .route(
            "/restaurants/{restaurant_id}/tables/",
            post(routes::restaurants::create_table::<S>).get(routes::restaurants::list_tables::<S>),
        )
        .route(
            "/restaurants/{restaurant_id}/tables/{table_id}/",
            get(routes::restaurants::get_table::<S>),
        )
        .route(
            "/restaurants/{restaurant_id}/tables/reserve/",
            post(routes::reservations::reserve_tables::<S>),
        )
        .route(
            "/restaurants/{restaurant_id}/tables/{table_id}/reserve/",
            post(routes::reservations::reserve_table::<S>),
        )
        .route(
            "/restaurants/{restaurant_id}/tables/{table_id}/reservations/{user_reservation_id}/cancel/",
            post(routes::reservations::cancel_reservation::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            session_keys,
            auth::session_middleware,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(authenticated)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
pub fn create_state<S: ReservationStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

/// Registers descriptions for the reservation metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "reservations_created_total",
        "Reservations committed, counting each element of a batch"
    );
    metrics::describe_counter!("reservations_canceled_total", "Reservations cancelled");
    metrics::describe_counter!(
        "reservations_rejected_total",
        "Reserve and cancel calls that failed, by operation and reason"
    );
    metrics::describe_histogram!("reservation_seats", "Seats held by each new reservation");
}
