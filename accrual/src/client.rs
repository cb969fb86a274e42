//! Accrual service client.
//!
//! The external service answers `GET /api/orders/<number>` with the
//! decided reward, asks for a pause with `429` + `Retry-After`, or is
//! temporarily unavailable. The client maps those outcomes onto [`Poll`]
//! so the worker can react without inspecting HTTP details.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use scrip_core::OrderNumber;

/// Fallback pause when a `429` carries no parseable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors produced by the accrual client.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    /// The HTTP request failed (connect, timeout, transport).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The decoded body of a successful accrual lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualReply {
    /// The order number, echoed by the service.
    pub order: String,

    /// Raw status string (`REGISTERED`, `PROCESSING`, `INVALID`,
    /// `PROCESSED`).
    pub status: String,

    /// The decided reward, present on positive `PROCESSED` results.
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

/// Outcome of polling the accrual service for one order.
#[derive(Debug)]
pub enum Poll {
    /// The service answered with a decoded reply.
    Ready(AccrualReply),

    /// The service is rate-limiting; pause for the given duration.
    RetryAfter(Duration),

    /// The service answered with an unexpected status; drop this attempt.
    Unavailable(StatusCode),
}

/// Client for the external accrual service.
#[derive(Debug, Clone)]
pub struct AccrualClient {
    client: Client,
    base_url: String,
}

impl AccrualClient {
    /// Create a client for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Poll the service for one order.
    ///
    /// # Errors
    ///
    /// Returns `AccrualError::Http` on transport failure or an
    /// undecodable `200` body.
    pub async fn poll_order(&self, number: &OrderNumber) -> Result<Poll, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Poll::RetryAfter(retry_after(&response)));
        }

        if status != StatusCode::OK {
            return Ok(Poll::Unavailable(status));
        }

        let reply = response.json::<AccrualReply>().await?;
        Ok(Poll::Ready(reply))
    }
}

/// Read the `Retry-After` header as whole seconds, with the one-minute
/// fallback on a missing or malformed value.
fn retry_after(response: &reqwest::Response) -> Duration {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_decodes_with_and_without_accrual() {
        let with: AccrualReply =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSED","accrual":10}"#)
                .unwrap();
        assert_eq!(with.accrual, Some(Decimal::TEN));

        let without: AccrualReply =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSING"}"#).unwrap();
        assert_eq!(without.status, "PROCESSING");
        assert!(without.accrual.is_none());
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = AccrualClient::new("http://accrual.local/");
        assert_eq!(client.base_url, "http://accrual.local");
    }
}
