//! Error types for scrip storage.

use scrip_core::{KeyId, UserId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Every variant except `Database` is a domain conflict the HTTP layer
/// maps to a client status code; `Database` is the only server-side kind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with the same login already exists.
    #[error("conflicting user login {login}")]
    ConflictingLogin {
        /// The contested login.
        login: String,
    },

    /// No user with the given login.
    #[error("could not find user with login {login}")]
    UserNotFound {
        /// The login that was looked up.
        login: String,
    },

    /// No user with the given id.
    #[error("could not find user with id {id}")]
    UserNotFoundById {
        /// The id that was looked up.
        id: UserId,
    },

    /// The order already exists and belongs to the same user.
    #[error("order {number} already exists for this user")]
    OrderExists {
        /// The contested order number.
        number: String,
    },

    /// The order already exists and belongs to another user.
    #[error("order {number} already exists for another user")]
    OrderCollision {
        /// The contested order number.
        number: String,
    },

    /// The requested withdrawal exceeds the user's balance.
    #[error("requested withdrawal amount exceeds the user's balance")]
    BalanceExceeded,

    /// No non-expired key with the given id.
    #[error("active key with id {id} not found")]
    KeyNotFound {
        /// The id that was looked up.
        id: KeyId,
    },

    /// There is no fresh key eligible for signing.
    #[error("there are no fresh keys in storage")]
    NoFreshKeys,

    /// No order with the given number.
    #[error("order {number} not found")]
    OrderNotFound {
        /// The number that was looked up.
        number: String,
    },

    /// The accrual status is outside the known vocabulary.
    #[error("invalid order status: {status}")]
    InvalidStatus {
        /// The rejected status string.
        status: String,
    },

    /// The backend failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
