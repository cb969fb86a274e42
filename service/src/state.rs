//! Application state.

use std::sync::Arc;

use tokio::sync::mpsc;

use scrip_core::Order;
use scrip_store::Store;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend, selected once at bootstrap.
    pub store: Arc<dyn Store>,

    /// Producer side of the accrual queue. Handlers offer new orders
    /// without blocking; a full queue drops the offer and leaves the
    /// order to the sweeper.
    pub orders: mpsc::Sender<Order>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, orders: mpsc::Sender<Order>) -> Self {
        Self { store, orders }
    }
}
