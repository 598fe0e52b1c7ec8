//! Balance and hold-audit integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn unfunded_owner_has_zero_balance() {
    let harness = TestHarness::new();

    assert_eq!(harness.balance_of(harness.test_owner_id).await, 0);
}

#[tokio::test]
async fn add_credits_accumulates() {
    let harness = TestHarness::new();
    let owner = harness.test_owner_id;

    harness.fund(owner, 5000).await;
    harness.fund(owner, 1000).await;

    assert_eq!(harness.balance_of(owner).await, 6000);
}

#[tokio::test]
async fn add_credits_rejects_non_positive_amount() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "owner_id": harness.test_owner_id.to_string(),
            "amount_cents": -50
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn add_credits_rejects_overflowing_top_up() {
    let harness = TestHarness::new();
    let owner = harness.test_owner_id;

    harness.fund(owner, i64::MAX).await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "owner_id": owner.to_string(),
            "amount_cents": 1
        }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(harness.balance_of(owner).await, i64::MAX);
}

#[tokio::test]
async fn balance_requires_auth() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/balance?owner_id={}", harness.test_owner_id))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/balance?owner_id={}", harness.test_owner_id))
        .add_header("x-api-key", "not-the-key".to_string())
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Hold listing
// ============================================================================

#[tokio::test]
async fn list_holds_empty() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/holds?owner_id={}", harness.test_owner_id))
        .add_header("x-api-key", harness.service_api_key.clone())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["holds"].as_array().unwrap().is_empty());
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn list_holds_shows_reservations() {
    let harness = TestHarness::new();
    let owner = harness.test_owner_id;
    harness.fund(owner, 100).await;

    harness
        .server
        .post("/v1/reservations")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "request_id": "r1",
            "owner_id": owner.to_string(),
            "amount_cents": 30,
            "description": "extraction job"
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/holds?owner_id={owner}&limit=10&offset=0"))
        .add_header("x-api-key", harness.service_api_key.clone())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let holds = body["holds"].as_array().unwrap();
    assert_eq!(holds.len(), 1);
    assert_eq!(holds[0]["request_id"], "r1");
    assert_eq!(holds[0]["state"], "held");
    assert_eq!(holds[0]["description"], "extraction job");
}
