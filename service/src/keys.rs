//! Signing-key management.
//!
//! The key set is kept hydrated by a startup call plus a periodic timer:
//! whenever no fresh key remains, a batch of new keys is minted with
//! overlapping validity windows. Tokens are always issued under a fresh
//! key picked uniformly at random.

use futures::future::try_join_all;

use scrip_core::{token, HmacKey, User};
use scrip_store::{Store, StoreError};

use crate::error::ApiError;

/// Number of keys minted when the set runs dry.
pub const NUM_KEYS_HYDRATED: usize = 4;

/// Ensure at least one fresh signing key exists.
///
/// If a fresh key is available this does nothing; otherwise it mints
/// [`NUM_KEYS_HYDRATED`] keys concurrently and persists each. By the time
/// the newest key stops being fresh the next hydration has minted
/// successors, while older keys keep verifying until they expire.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn hydrate_keys(store: &dyn Store) -> Result<(), StoreError> {
    match store.extract_random_key().await {
        Ok(_) => Ok(()),
        Err(StoreError::NoFreshKeys) => {
            let minted = (0..NUM_KEYS_HYDRATED).map(|_| async {
                let key = HmacKey::generate();
                store.create_key(&key).await
            });
            try_join_all(minted).await?;

            tracing::info!(count = NUM_KEYS_HYDRATED, "hydrated signing key set");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Issue a bearer token for the user, as a full `Authorization` header
/// value.
///
/// # Errors
///
/// Fails with `ApiError::Internal` when no fresh key exists (the rotator
/// keeps that from happening in a healthy process) or signing fails.
pub async fn issue_token(store: &dyn Store, user: &User) -> Result<String, ApiError> {
    let key = store.extract_random_key().await?;
    let token =
        token::sign(user.id, &key).map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(format!("Bearer {token}"))
}
