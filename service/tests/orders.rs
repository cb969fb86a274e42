//! Order upload and listing integration tests.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestHarness;

use scrip_core::{Order, OrderNumber};
use scrip_store::Store;

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn upload_accepts_valid_luhn_number() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    // First upload is accepted for processing.
    harness
        .server
        .post("/api/user/orders")
        .add_header("authorization", alice.clone())
        .text("4561261212345467")
        .await
        .assert_status(StatusCode::ACCEPTED);

    // The same user re-uploading the same number is fine.
    harness
        .server
        .post("/api/user/orders")
        .add_header("authorization", alice)
        .text("4561261212345467")
        .await
        .assert_status_ok();

    // Another user claiming the number is a conflict.
    let eve = harness.register("eve", "sikret").await;
    harness
        .server
        .post("/api/user/orders")
        .add_header("authorization", eve)
        .text("4561261212345467")
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn upload_rejects_bad_checksum() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    harness
        .server
        .post("/api/user/orders")
        .add_header("authorization", alice)
        .text("4561261212345468")
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upload_rejects_empty_body() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    harness
        .server
        .post("/api/user/orders")
        .add_header("authorization", alice)
        .text("")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn upload_requires_authentication() {
    let harness = TestHarness::new().await;

    harness
        .server
        .post("/api/user/orders")
        .text("4561261212345467")
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn listing_is_empty_without_orders() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    harness
        .server
        .get("/api/user/orders")
        .add_header("authorization", alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn listing_shows_status_and_accrual() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    harness
        .credit(&alice, "12345678903", rust_decimal::Decimal::TEN)
        .await;

    let response = harness
        .server
        .get("/api/user/orders")
        .add_header("authorization", alice)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["number"], "12345678903");
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"], serde_json::json!(10.0));
    assert!(orders[0]["uploaded_at"].is_string());
}

#[tokio::test]
async fn listing_is_sorted_by_upload_time() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;
    let user = harness.store.extract_user("alice").await.unwrap();

    // Seed with explicit timestamps so the order is unambiguous.
    let late = Order::new(
        OrderNumber::new("4561261212345467").unwrap(),
        user.id,
        Utc::now() + Duration::seconds(30),
    );
    let early = Order::new(
        OrderNumber::new("12345678903").unwrap(),
        user.id,
        Utc::now(),
    );

    harness.store.create_order(&late).await.unwrap();
    harness.store.create_order(&early).await.unwrap();

    let response = harness
        .server
        .get("/api/user/orders")
        .add_header("authorization", alice)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let orders = body.as_array().unwrap();
    assert_eq!(orders[0]["number"], "12345678903");
    assert_eq!(orders[1]["number"], "4561261212345467");
}
