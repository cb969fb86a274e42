//! Bearer token codec.
//!
//! Tokens are JWS HS256 compact serializations. The header carries a
//! `kid` hint naming the signing key so verification can pick it out of
//! the rolling key set; the payload carries the user id and a standard
//! `exp` claim three hours out.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{HmacKey, KeyId, UserId};

/// Lifetime of an issued token (3 hours).
#[must_use]
pub fn token_period() -> Duration {
    Duration::hours(3)
}

/// Claims carried by a scrip token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user id.
    pub user: UserId,

    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Errors produced by the token codec.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token names an algorithm other than HS256.
    #[error("unexpected signing method, HS256 expected")]
    UnexpectedSigningMethod,

    /// The token header has no `kid` hint.
    #[error("no key id provided for token validation")]
    MissingKeyId,

    /// The `kid` hint does not name a known, non-expired key.
    #[error("key with id {0} not found")]
    KeyNotFound(String),

    /// The token has expired.
    #[error("token has expired")]
    Expired,

    /// The token is malformed or its signature does not verify.
    #[error("invalid token")]
    Invalid,
}

/// Sign a token for `user` under the given key.
///
/// # Errors
///
/// Returns `TokenError::Invalid` if the JWS encoding fails.
pub fn sign(user: UserId, key: &HmacKey) -> Result<String, TokenError> {
    let claims = Claims {
        user,
        exp: (Utc::now() + token_period()).timestamp(),
    };

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(key.id.to_string());

    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(&key.sign))
        .map_err(|_| TokenError::Invalid)
}

/// Verify a token against the rolling key set and return the user id.
///
/// A token verifies iff its signing key is in the set and not expired,
/// its signature checks out, and its `exp` is in the future (no leeway).
///
/// # Errors
///
/// Returns the specific [`TokenError`] kind for each failure; callers
/// treat every kind as "unauthenticated".
pub fn verify(token: &str, keys: &HashMap<KeyId, HmacKey>) -> Result<UserId, TokenError> {
    let header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::Invalid)?;

    if header.alg != Algorithm::HS256 {
        return Err(TokenError::UnexpectedSigningMethod);
    }

    let kid = header.kid.ok_or(TokenError::MissingKeyId)?;
    let key_id: KeyId = kid.parse().map_err(|_| TokenError::KeyNotFound(kid.clone()))?;
    let key = keys
        .get(&key_id)
        .filter(|key| !key.is_expired())
        .ok_or_else(|| TokenError::KeyNotFound(kid))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(&key.sign),
        &validation,
    )
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::UnexpectedSigningMethod,
        _ => TokenError::Invalid,
    })?;

    Ok(data.claims.user)
}
