//! Order upload and listing handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use scrip_core::{Order, OrderNumber};
use scrip_store::StoreError;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/user/orders`: accept a raw order number for accrual.
///
/// The body is the bare digit string. Responds 202 for a newly accepted
/// order, 200 when the caller already uploaded it, 400 on an empty body,
/// 409 when another user owns the number, 422 when the Luhn check fails.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: String,
) -> Result<StatusCode, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty order number".to_string()));
    }

    let number: OrderNumber = body
        .parse()
        .map_err(|_| ApiError::Unprocessable(format!("invalid order number: {body}")))?;

    let order = Order::new(number, user.id, Utc::now());

    match state.store.create_order(&order).await {
        Ok(()) => {}
        Err(StoreError::OrderExists { .. }) => return Ok(StatusCode::OK),
        Err(StoreError::OrderCollision { number }) => {
            return Err(ApiError::Conflict(format!(
                "order {number} belongs to another user"
            )))
        }
        Err(err) => return Err(err.into()),
    }

    // Non-blocking offer: a full queue drops the order here and the
    // sweeper re-discovers it on its next tick.
    if state.orders.try_send(order).is_err() {
        tracing::debug!("accrual queue full, leaving order to the sweeper");
    }

    Ok(StatusCode::ACCEPTED)
}

/// `GET /api/user/orders`: list the caller's orders, oldest upload first.
///
/// Responds 204 when the user has no orders.
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    let orders = state.store.extract_orders_by_user(user.id).await?;

    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(orders).into_response())
}
