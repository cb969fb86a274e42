//! Authentication extractor.
//!
//! `AuthUser` attempts bearer-token verification against the rolling key
//! set and loads the owning user. Every failure of the auth taxonomy
//! (absent or unparseable header, unknown `kid`, bad signature, expired
//! token, unknown user) rejects the request with a bodyless 401; only
//! storage failures surface as server errors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use scrip_core::{token, User};
use scrip_store::StoreError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user, extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let bearer = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        // Storage failures here are server errors, not auth failures.
        let keys = state.store.extract_all_keys().await.map_err(|err| {
            ApiError::Internal(err.to_string())
        })?;

        let user_id = token::verify(bearer, &keys).map_err(|_| ApiError::Unauthorized)?;

        match state.store.extract_user_by_id(user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(StoreError::UserNotFoundById { .. }) => Err(ApiError::Unauthorized),
            Err(err) => Err(ApiError::Internal(err.to_string())),
        }
    }
}
