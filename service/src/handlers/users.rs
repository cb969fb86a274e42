//! Registration and login handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use scrip_core::User;
use scrip_store::StoreError;

use crate::error::ApiError;
use crate::keys;
use crate::state::AppState;

/// Credentials accepted by both registration and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Case-sensitive login.
    #[serde(default)]
    pub login: String,
    /// Plaintext password, hashed before it ever reaches the store.
    #[serde(default)]
    pub password: String,
}

fn validate(body: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    let Json(creds) =
        body.map_err(|_| ApiError::BadRequest("malformed credentials".to_string()))?;
    if creds.login.is_empty() || creds.password.is_empty() {
        return Err(ApiError::BadRequest(
            "login and password must not be empty".to_string(),
        ));
    }
    Ok(creds)
}

/// `POST /api/user/register`: create a user and log them in.
///
/// Responds 200 with the bearer token in the `Authorization` header,
/// 400 on malformed or empty credentials, 409 when the login is taken.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let creds = validate(body)?;

    // Argon2id at these parameters is deliberately slow; keep it off the
    // async worker threads.
    let user = tokio::task::spawn_blocking(move || User::new(creds.login, &creds.password))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    state.store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, login = %user.login, "user registered");

    let header = keys::issue_token(state.store.as_ref(), &user).await?;
    Ok((StatusCode::OK, [(AUTHORIZATION, header)]).into_response())
}

/// `POST /api/user/login`: authenticate and issue a token.
///
/// Responds 200 with the bearer token in the `Authorization` header,
/// 400 on malformed credentials, 401 for an unknown login or a wrong
/// password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let creds = validate(body)?;

    let user = match state.store.extract_user(&creds.login).await {
        Ok(user) => user,
        Err(StoreError::UserNotFound { .. }) => return Err(ApiError::Unauthorized),
        Err(err) => return Err(err.into()),
    };

    let password = creds.password;
    let checked = {
        let user = user.clone();
        tokio::task::spawn_blocking(move || user.verify_password(&password))
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?
            .map_err(|err| ApiError::Internal(err.to_string()))?
    };

    if !checked {
        return Err(ApiError::Unauthorized);
    }

    let header = keys::issue_token(state.store.as_ref(), &user).await?;
    Ok((StatusCode::OK, [(AUTHORIZATION, header)]).into_response())
}
