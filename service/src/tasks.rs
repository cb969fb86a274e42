//! Periodic background jobs.
//!
//! Three independent timers run for the life of the process: signing-key
//! hydration, the order sweeper (lives in `scrip-accrual`), and the store
//! health ping. Each logs failures and keeps ticking; none of them can
//! take the process down.

use std::sync::Arc;
use std::time::Duration;

use scrip_store::Store;

use crate::keys;

/// Cadence shared by the rotator, the sweeper, and the health ping.
pub const BACKGROUND_PERIOD: Duration = Duration::from_secs(30);

/// Keep the signing key set hydrated.
pub async fn run_key_rotator(store: Arc<dyn Store>, period: Duration) {
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        if let Err(err) = keys::hydrate_keys(store.as_ref()).await {
            tracing::warn!(error = %err, "could not hydrate signing keys");
        }
    }
}

/// Periodically check that the store is reachable.
pub async fn run_pinger(store: Arc<dyn Store>, period: Duration) {
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        if let Err(err) = store.ping().await {
            tracing::warn!(error = %err, "store health check failed");
        }
    }
}
