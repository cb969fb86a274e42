//! Balance view and withdrawal integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use rust_decimal::Decimal;
use serde_json::json;

// ============================================================================
// Balance view
// ============================================================================

#[tokio::test]
async fn fresh_account_has_zero_balance() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    let response = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", alice)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["current"], json!(0.0));
    assert_eq!(body["withdrawn"], json!(0.0));
}

#[tokio::test]
async fn balance_reflects_credits_and_withdrawals() {
    let harness = TestHarness::new().await;
    let bob = harness.register("bob", "sikret").await;

    harness.credit(&bob, "12345678903", Decimal::new(420, 0)).await;

    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bob.clone())
        .json(&json!({ "order": "4561261212345467", "sum": 2.5 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", bob)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["current"], json!(417.5));
    assert_eq!(body["withdrawn"], json!(2.5));
}

#[tokio::test]
async fn balance_requires_authentication() {
    let harness = TestHarness::new().await;

    harness
        .server
        .get("/api/user/balance")
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Withdrawal
// ============================================================================

#[tokio::test]
async fn withdrawal_is_atomic_against_the_balance() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;
    harness
        .credit(&alice, "12345678903", Decimal::new(1337, 2))
        .await;

    // More than the balance: rejected, and the order stays free.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice.clone())
        .json(&json!({ "order": "2377225624", "sum": "42" }))
        .await
        .assert_status(StatusCode::PAYMENT_REQUIRED);

    // Within the balance: the same order number is still available.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice.clone())
        .json(&json!({ "order": "2377225624", "sum": "1" }))
        .await
        .assert_status_ok();

    // The order now exists, so a second withdrawal against it fails.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice)
        .json(&json!({ "order": "2377225624", "sum": "1" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // Same for any other user.
    let eve = harness.register("eve", "sikret").await;
    harness
        .credit(&eve, "4561261212345467", Decimal::new(100, 0))
        .await;
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", eve)
        .json(&json!({ "order": "2377225624", "sum": "1" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn withdrawal_validates_its_input() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    // Missing fields.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice.clone())
        .json(&json!({ "order": "2377225624" }))
        .await
        .assert_status_bad_request();

    // Non-positive sum.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice.clone())
        .json(&json!({ "order": "2377225624", "sum": -1 }))
        .await
        .assert_status_bad_request();

    // Invalid order number.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", alice)
        .json(&json!({ "order": "123", "sum": 1 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // No token at all.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .json(&json!({ "order": "2377225624", "sum": 1 }))
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Withdrawal listing
// ============================================================================

#[tokio::test]
async fn withdrawals_listing_is_empty_without_any() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice", "sikret").await;

    harness
        .server
        .get("/api/user/withdrawals")
        .add_header("authorization", alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn withdrawals_listing_shows_applied_debits() {
    let harness = TestHarness::new().await;
    let bob = harness.register("bob", "sikret").await;
    harness.credit(&bob, "12345678903", Decimal::new(50, 0)).await;

    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bob.clone())
        .json(&json!({ "order": "2377225624", "sum": 7.5 }))
        .await
        .assert_status_ok();
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bob.clone())
        .json(&json!({ "order": "4561261212345467", "sum": 2.5 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/user/withdrawals")
        .add_header("authorization", bob)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let withdrawals = body.as_array().unwrap();
    assert_eq!(withdrawals.len(), 2);
    assert_eq!(withdrawals[0]["order"], "2377225624");
    assert_eq!(withdrawals[0]["sum"], json!(7.5));
    assert_eq!(withdrawals[1]["order"], "4561261212345467");
    assert!(withdrawals[0]["processed_at"].is_string());
}
