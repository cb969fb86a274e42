//! HTTP API for the scrip loyalty service.
//!
//! This crate wires the store, the token subsystem, and the accrual
//! pipeline behind a thin axum surface under `/api`:
//!
//! - `POST /api/user/register`, `POST /api/user/login` — issue bearer
//!   tokens in the `Authorization` response header
//! - `POST/GET /api/user/orders` — upload and list orders
//! - `GET /api/user/balance`, `POST /api/user/balance/withdraw`,
//!   `GET /api/user/withdrawals` — the balance engine
//!
//! The binary entry point adds the background jobs: signing-key
//! hydration, the order sweeper, the store health ping, and the accrual
//! worker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod routes;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
