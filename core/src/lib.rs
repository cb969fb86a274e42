//! Core types and utilities for scrip.
//!
//! This crate provides the foundational types used throughout the scrip
//! loyalty platform:
//!
//! - **Identifiers**: `UserId`, `KeyId`, `WithdrawalId`
//! - **Orders**: `Order`, `OrderNumber`, `OrderStatus`
//! - **Users**: `User` with Argon2id password hashing
//! - **Withdrawals**: `Withdrawal`
//! - **Auth primitives**: `HmacKey` signing keys and the HS256 token codec
//!
//! # Money
//!
//! Every balance, accrual and withdrawal sum is a `rust_decimal::Decimal`:
//! exact decimal arithmetic, no binary floating point anywhere in the
//! balance equation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod keys;
pub mod order;
pub mod password;
pub mod token;
pub mod user;
pub mod withdrawal;

pub use ids::{IdError, KeyId, UserId, WithdrawalId};
pub use keys::{HmacKey, KEY_LENGTH};
pub use order::{Order, OrderError, OrderNumber, OrderStatus};
pub use password::PasswordError;
pub use token::{Claims, TokenError};
pub use user::User;
pub use withdrawal::Withdrawal;
