//! Storage layer for scrip.
//!
//! This crate provides the single repository facade consumed by the HTTP
//! layer and the accrual pipeline, with two interchangeable backends:
//!
//! - [`MemoryStore`]: one read-write lock over plain maps, used when no
//!   database DSN is configured and throughout the test suite.
//! - [`PgStore`]: Postgres via `sqlx`, one transaction per compound
//!   operation, `SELECT … FOR UPDATE` serialising balance movements.
//!
//! Both backends present identical semantics: the same conflict taxonomy,
//! the same listing orders, and the same balance invariant (`balance ≥ 0`
//! at every visible state). Callers always receive owned copies of
//! entities, never shared references into the store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use scrip_core::{HmacKey, KeyId, Order, OrderNumber, User, UserId, Withdrawal};

/// The storage trait defining all repository operations.
///
/// Implementations are selected once at bootstrap and consumed as
/// `Arc<dyn Store>` by handlers and background tasks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the backend is down.
    async fn ping(&self) -> Result<()>;

    // =========================================================================
    // Signing keys
    // =========================================================================

    /// Persist a new HMAC key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn create_key(&self, key: &HmacKey) -> Result<()>;

    /// Get a specific non-expired key by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KeyNotFound` if the key is absent or expired.
    async fn extract_key(&self, id: KeyId) -> Result<HmacKey>;

    /// Get one uniformly-chosen fresh key, eligible for signing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoFreshKeys` when no key is fresh.
    async fn extract_random_key(&self) -> Result<HmacKey>;

    /// Get every non-expired key, keyed by id.
    ///
    /// Used for verification: includes keys that are no longer fresh but
    /// have not yet expired, so older tokens keep verifying.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn extract_all_keys(&self) -> Result<HashMap<KeyId, HmacKey>>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Persist a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConflictingLogin` if the login is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by login.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UserNotFound` if no such user exists.
    async fn extract_user(&self, login: &str) -> Result<User>;

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UserNotFoundById` if no such user exists.
    async fn extract_user_by_id(&self, id: UserId) -> Result<User>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Persist a new order; insertion happens iff the number is globally
    /// absent.
    ///
    /// # Errors
    ///
    /// - `StoreError::OrderExists` when the number belongs to the same user.
    /// - `StoreError::OrderCollision` when it belongs to another user.
    async fn create_order(&self, order: &Order) -> Result<()>;

    /// List a user's orders, ordered by upload time ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn extract_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// List every order that has not reached a terminal status, ordered by
    /// upload time ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn extract_unterminated_orders(&self) -> Result<Vec<Order>>;

    // =========================================================================
    // Withdrawals
    // =========================================================================

    /// Apply a withdrawal in a single transaction: insert the (new) order,
    /// lock the owner's balance, check sufficiency, insert the withdrawal,
    /// and debit the balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::OrderExists` / `StoreError::OrderCollision` when the
    ///   order number is already taken.
    /// - `StoreError::BalanceExceeded` when the balance is insufficient; no
    ///   partial effect survives.
    async fn create_withdrawal(&self, withdrawal: &Withdrawal, order: &Order) -> Result<()>;

    /// List a user's withdrawals, ordered by processing time ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn extract_withdrawals_by_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>>;

    /// Total withdrawn sum for a user; zero when there are no withdrawals.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn total_withdrawn_sum(&self, user_id: UserId) -> Result<Decimal>;

    // =========================================================================
    // Accrual application
    // =========================================================================

    /// Apply an accrual result: update the order status and, when `sum` is
    /// present, set the order's accrual and credit the owner's balance,
    /// all atomically.
    ///
    /// The raw status comes from the external accrual service and is
    /// normalised (`REGISTERED` → `NEW`). Orders already in a terminal
    /// status are left untouched and the call succeeds as a no-op, which
    /// makes re-delivery of the same result idempotent.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidStatus` for an unknown status string.
    /// - `StoreError::OrderNotFound` when the order does not exist.
    async fn process_accrual(
        &self,
        number: &OrderNumber,
        status: &str,
        sum: Option<Decimal>,
    ) -> Result<()>;
}
