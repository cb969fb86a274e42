//! Order numbers, statuses, and the order entity.
//!
//! Order numbers are strings of decimal digits validated with the Luhn
//! mod-10 checksum. Statuses form a small state machine: `NEW` →
//! `PROCESSING` → {`PROCESSED`, `INVALID`}, where the last two are
//! terminal and absorbing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::UserId;

/// A Luhn-validated order number.
///
/// Construction is the only validation point: once an `OrderNumber`
/// exists, the digits have passed the checksum.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Validate and wrap an order number.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidNumber` if the input is empty, contains
    /// a non-digit, or fails the Luhn checksum.
    pub fn new(number: impl Into<String>) -> Result<Self, OrderError> {
        let number = number.into();
        if luhn_valid(&number) {
            Ok(Self(number))
        } else {
            Err(OrderError::InvalidNumber(number))
        }
    }

    /// Return the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Luhn mod-10 check over a string of decimal digits.
///
/// Empty strings and strings with non-digit characters fail.
fn luhn_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    let parity = number.len() % 2;

    for (i, ch) in number.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            return false;
        };
        let mut digit = digit;
        if i % 2 == parity {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

impl FromStr for OrderNumber {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderNumber({})", self.0)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

/// Status of an order in the accrual pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Uploaded, not yet seen by the accrual service.
    New,

    /// The accrual service is working on it.
    Processing,

    /// Terminal: the accrual service rejected the order.
    Invalid,

    /// Terminal: reward decided (and credited when positive).
    Processed,
}

impl OrderStatus {
    /// Check whether this status is terminal (absorbing).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    /// The uppercase wire name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }

    /// Parse a status as reported by the external accrual service.
    ///
    /// The accrual service additionally uses `REGISTERED`, which maps to
    /// `NEW`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` for anything outside the known
    /// vocabulary.
    pub fn from_accrual_status(status: &str) -> Result<Self, OrderError> {
        match status {
            "REGISTERED" | "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            other => Err(OrderError::InvalidStatus(other.to_string())),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            other => Err(OrderError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order uploaded by a user.
///
/// Created `NEW` either by an explicit upload or implicitly when a
/// withdrawal is pinned to a fresh order number. The accrual pipeline
/// moves it toward a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// The Luhn-validated order number.
    pub number: OrderNumber,

    /// Current pipeline status.
    pub status: OrderStatus,

    /// When the order was accepted.
    pub uploaded_at: DateTime<Utc>,

    /// The owning user. Never serialized in listings.
    #[serde(skip)]
    pub user_id: UserId,

    /// Reward decided by the accrual service; present only once the order
    /// is `PROCESSED` with a positive reward.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
}

impl Order {
    /// Create a new order in `NEW` status with no accrual.
    #[must_use]
    pub fn new(number: OrderNumber, user_id: UserId, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            number,
            status: OrderStatus::New,
            uploaded_at,
            user_id,
            accrual: None,
        }
    }
}

/// Errors that can occur when validating orders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The order number is empty, non-numeric, or fails the Luhn checksum.
    #[error("invalid order number: {0}")]
    InvalidNumber(String),

    /// The status string is outside the known vocabulary.
    #[error("invalid order status: {0}")]
    InvalidStatus(String),
}
