//! HMAC signing keys for the token subsystem.
//!
//! Keys live for [`key_period`] but stop being *fresh* (eligible to sign
//! new tokens) `4 × `[`key_refresh_period`] before they expire. The gap
//! keeps every in-flight token verifiable: by the time the newest key
//! stops signing, rotation has minted successors, while the old key still
//! verifies until it truly expires.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::KeyId;

/// Length of the key material in bytes.
pub const KEY_LENGTH: usize = 64;

/// Lifetime of a signing key (30 days).
#[must_use]
pub fn key_period() -> Duration {
    Duration::days(30)
}

/// Refresh period (6 hours): keys become non-fresh `4 ×` this before
/// expiry.
#[must_use]
pub fn key_refresh_period() -> Duration {
    Duration::hours(6)
}

/// A secret HMAC key of the rolling signing set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacKey {
    /// The key id, referenced by token `kid` headers.
    pub id: KeyId,

    /// The raw key material ([`KEY_LENGTH`] random bytes).
    pub sign: Vec<u8>,

    /// When the key expires for verification purposes.
    pub expires_at: DateTime<Utc>,
}

impl HmacKey {
    /// Mint a new key with a random id, fresh OS entropy, and the full
    /// [`key_period`] lifetime.
    #[must_use]
    pub fn generate() -> Self {
        let mut sign = vec![0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut sign);

        Self {
            id: KeyId::generate(),
            sign,
            expires_at: Utc::now() + key_period(),
        }
    }

    /// Check whether the key is expired (unusable even for verification).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check whether the key is fresh (usable for signing new tokens).
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at - key_refresh_period() * 4
    }
}
