//! The user entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::password::{self, PasswordError};
use crate::UserId;

/// A registered user.
///
/// The balance only moves inside store transactions: accrual credits add
/// to it, withdrawal debits subtract from it, and it never goes below
/// zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user id.
    pub id: UserId,

    /// Unique, case-sensitive login.
    pub login: String,

    /// PHC-encoded Argon2id password hash.
    pub password_hash: String,

    /// Current loyalty balance.
    pub balance: Decimal,
}

impl User {
    /// Create a new user with a freshly hashed password and zero balance.
    ///
    /// # Errors
    ///
    /// Returns an error if password hashing fails.
    pub fn new(login: impl Into<String>, password: &str) -> Result<Self, PasswordError> {
        Ok(Self {
            id: UserId::generate(),
            login: login.into(),
            password_hash: password::hash_password(password)?,
            balance: Decimal::ZERO,
        })
    }

    /// Check a candidate password against the stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed.
    pub fn verify_password(&self, password: &str) -> Result<bool, PasswordError> {
        password::verify_password(password, &self.password_hash)
    }
}
