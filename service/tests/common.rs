//! Common test utilities for scrip integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use scrip_accrual::ORDERS_QUEUE_CAPACITY;
use scrip_core::{Order, OrderNumber};
use scrip_service::{create_router, keys, AppState};
use scrip_store::{MemoryStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the backing store for seeding state.
    pub store: Arc<MemoryStore>,
    /// Kept alive so non-blocking offers from the upload handler land
    /// somewhere instead of erroring on a closed queue.
    _orders_rx: mpsc::Receiver<Order>,
}

impl TestHarness {
    /// Create a new test harness on a fresh in-memory store with a
    /// hydrated signing key set.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        keys::hydrate_keys(store.as_ref())
            .await
            .expect("Failed to hydrate signing keys");

        let (orders_tx, orders_rx) = mpsc::channel(ORDERS_QUEUE_CAPACITY);
        let state = AppState::new(Arc::clone(&store) as Arc<dyn Store>, orders_tx);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _orders_rx: orders_rx,
        }
    }

    /// Register a user and return the full `Authorization` header value.
    pub async fn register(&self, login: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/user/register")
            .json(&serde_json::json!({ "login": login, "password": password }))
            .await;
        response.assert_status_ok();

        response
            .headers()
            .get("authorization")
            .expect("registration must issue a token")
            .to_str()
            .expect("token header must be ASCII")
            .to_string()
    }

    /// Upload an order through the API and credit it with a `PROCESSED`
    /// accrual, growing the user's balance by `amount`.
    pub async fn credit(&self, auth: &str, number: &str, amount: Decimal) {
        self.server
            .post("/api/user/orders")
            .add_header("authorization", auth)
            .text(number.to_string())
            .await
            .assert_status(axum::http::StatusCode::ACCEPTED);

        let number = OrderNumber::new(number).expect("test order numbers are valid");
        self.store
            .process_accrual(&number, "PROCESSED", Some(amount))
            .await
            .expect("Failed to credit accrual");
    }
}
