//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CatalogError, ReserveError};
use serde::Serialize;

/// Machine-readable error codes returned in the `code` field.
pub mod codes {
    pub const RESERVE_TABLE: &str = "reservation.table.reserve.error";
    pub const RESERVE_TABLES: &str = "reservation.tables.reserve.error";
    pub const CANCEL_RESERVATION: &str = "reservation.table.cancel.error";
    pub const BAD_DATA: &str = "reservation.table.reserve.bad_data";
    pub const RESTAURANT: &str = "restaurant.error";
    pub const UNAUTHORIZED: &str = "auth.unauthorized";
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid session.
    Unauthorized(String),
    /// Malformed path parameter or body.
    BadRequest { code: &'static str, message: String },
    /// A reservation operation failed.
    Reserve {
        code: &'static str,
        source: ReserveError,
    },
    /// A restaurant or table operation failed.
    Catalog(CatalogError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Returns a mapper tagging reservation errors with `code`.
    ///
    /// ```ignore
    /// service.reserve_table(req).await.map_err(ApiError::reserve(codes::RESERVE_TABLE))?;
    /// ```
    pub fn reserve(code: &'static str) -> impl FnOnce(ReserveError) -> Self {
        move |source| ApiError::Reserve { code, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            // Every reserve failure other than a missing row is a 400.
            ApiError::Reserve { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Reserve { .. } => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => codes::UNAUTHORIZED,
            ApiError::BadRequest { code, .. } | ApiError::Reserve { code, .. } => *code,
            ApiError::Catalog(_) => codes::RESTAURANT,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest { message: msg, .. } => {
                f.write_str(msg)
            }
            ApiError::Reserve { source, .. } => write!(f, "{source}"),
            ApiError::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Reserve {
                source: ReserveError::Internal(_) | ReserveError::InconsistentTable { .. },
                ..
            }
            | ApiError::Catalog(CatalogError::Store(_)) => {
                tracing::error!(error = %self, "internal server error");
            }
            _ => tracing::debug!(status = status.as_u16(), error = %self, "request failed"),
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}
