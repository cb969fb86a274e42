//! Balance view and withdrawal handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scrip_core::{Order, OrderNumber, Withdrawal};
use scrip_store::StoreError;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    /// Sum withdrawn over the account's lifetime.
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

/// `GET /api/user/balance`: the caller's current and withdrawn totals.
pub async fn current(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let withdrawn = state.store.total_withdrawn_sum(user.id).await?;

    Ok(Json(BalanceResponse {
        current: user.balance,
        withdrawn,
    }))
}

/// Withdrawal request body.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Order number to pin the withdrawal to. Accepts both string and
    /// number forms of the sum.
    pub order: Option<String>,
    /// Amount to withdraw.
    pub sum: Option<Decimal>,
}

/// `POST /api/user/balance/withdraw`: debit the balance against a new
/// order number.
///
/// Responds 200 on success, 400 on missing fields or a non-positive sum,
/// 402 when the balance is insufficient, 422 when the order number is
/// invalid or already taken.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) =
        body.map_err(|_| ApiError::BadRequest("malformed withdrawal request".to_string()))?;

    let (Some(order), Some(sum)) = (request.order, request.sum) else {
        return Err(ApiError::BadRequest(
            "order and sum are both required".to_string(),
        ));
    };

    if order.is_empty() || sum <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "sum must be positive and the order non-empty".to_string(),
        ));
    }

    let number: OrderNumber = order
        .parse()
        .map_err(|_| ApiError::Unprocessable(format!("invalid order number: {order}")))?;

    let now = Utc::now();
    let order = Order::new(number.clone(), user.id, now);
    let withdrawal = Withdrawal::new(number, sum, now);

    match state.store.create_withdrawal(&withdrawal, &order).await {
        Ok(()) => {
            tracing::info!(
                user_id = %user.id,
                order = %withdrawal.order_number,
                sum = %withdrawal.sum,
                "withdrawal applied"
            );
            Ok(StatusCode::OK)
        }
        // A withdrawal must create its order; any pre-existing number,
        // whoever owns it, is unusable.
        Err(StoreError::OrderExists { number } | StoreError::OrderCollision { number }) => {
            Err(ApiError::Unprocessable(format!(
                "order {number} is not available for withdrawal"
            )))
        }
        Err(StoreError::BalanceExceeded) => Err(ApiError::PaymentRequired(
            "requested sum exceeds the current balance".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}
