//! Router configuration.
//!
//! This module sets up the axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{balance, orders, users, withdrawals};
use crate::state::AppState;

/// Per-request timeout at the HTTP boundary.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum request body size in bytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `POST /api/user/register` - Create a user, respond with a token
/// - `POST /api/user/login` - Authenticate, respond with a token
///
/// ## Authenticated (bearer token)
/// - `POST /api/user/orders` - Upload an order number
/// - `GET /api/user/orders` - List uploaded orders
/// - `GET /api/user/balance` - Current and withdrawn totals
/// - `POST /api/user/balance/withdraw` - Debit against a new order
/// - `GET /api/user/withdrawals` - List withdrawals
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Users
        .route("/api/user/register", post(users::register))
        .route("/api/user/login", post(users::login))
        // Orders
        .route("/api/user/orders", post(orders::upload).get(orders::list))
        // Balance
        .route("/api/user/balance", get(balance::current))
        .route("/api/user/balance/withdraw", post(balance::withdraw))
        .route("/api/user/withdrawals", get(withdrawals::list))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
