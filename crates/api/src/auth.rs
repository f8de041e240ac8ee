//! Session tokens and the middleware that verifies them.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use common::{ProfileId, RestaurantId};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const SESSION_EXPIRY_HOURS: i64 = 24;

/// JWT claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account ID
    pub sub: String,
    pub profile_id: ProfileId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<RestaurantId>,
    pub email: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated caller, inserted into request extensions by
/// [`session_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account_id: String,
    pub profile_id: ProfileId,
    pub restaurant_id: Option<RestaurantId>,
    pub email: String,
}

/// HMAC keys for issuing and verifying session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Signs a token for `session` valid for `ttl`.
    pub fn issue(
        &self,
        session: &Session,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: session.account_id.clone(),
            profile_id: session.profile_id,
            restaurant_id: session.restaurant_id,
            email: session.email.clone(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
    }

    /// Checks a token's signature and expiry and returns its session.
    pub fn verify(&self, token: &str) -> Result<Session, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;

        Ok(Session {
            account_id: data.claims.sub,
            profile_id: data.claims.profile_id,
            restaurant_id: data.claims.restaurant_id,
            email: data.claims.email,
        })
    }
}

/// Creates a session token signed with `secret`.
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    SessionKeys::from_secret(secret).issue(session, Duration::hours(SESSION_EXPIRY_HOURS))
}

/// Middleware that verifies the bearer token and stores the [`Session`]
/// in request extensions.
pub async fn session_middleware(
    State(keys): State<Arc<SessionKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("invalid Authorization format".to_string()))?;

    let session = keys.verify(token).map_err(|e| {
        tracing::debug!("session token rejected: {e}");
        ApiError::Unauthorized("invalid or expired session".to_string())
    })?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
