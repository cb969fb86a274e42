//! The withdrawal entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{OrderNumber, WithdrawalId};

/// A debit against a user's balance, pinned to a newly created order.
///
/// Immutable after creation; at most one withdrawal exists per order
/// number.
#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    /// The withdrawal id. Never serialized in listings.
    #[serde(skip)]
    pub id: WithdrawalId,

    /// The order number the withdrawal is pinned to.
    #[serde(rename = "order")]
    pub order_number: OrderNumber,

    /// The debited amount; always positive.
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,

    /// When the withdrawal was applied.
    pub processed_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Create a new withdrawal against the given order.
    #[must_use]
    pub fn new(order_number: OrderNumber, sum: Decimal, processed_at: DateTime<Utc>) -> Self {
        Self {
            id: WithdrawalId::generate(),
            order_number,
            sum,
            processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn listing_form() {
        let number = OrderNumber::new("2377225624").unwrap();
        let withdrawal = Withdrawal::new(number, Decimal::new(25, 1), Utc::now());
        let json = serde_json::to_value(&withdrawal).unwrap();

        assert_eq!(json["order"], "2377225624");
        assert_eq!(json["sum"], 2.5);
        assert!(json.get("id").is_none());
        assert!(json["processed_at"].is_string());
    }
}
