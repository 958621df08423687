//! Wallet transaction and webhook reconciliation integration tests.

mod common;

use common::TestHarness;
use serde_json::{json, Value};

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn create_transaction_returns_pending_and_qr_payload() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;

    let response = harness
        .server
        .post("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .json(&json!({
            "amount": 100_000,
            "payment_method": "bank_transfer",
            "additional_data": {"source": "mobile"}
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["transaction"]["status"], 0);
    assert_eq!(body["transaction"]["amount"], 100_000);

    let code = body["transaction"]["code"].as_str().unwrap();
    assert_eq!(code.len(), 12);

    // The QR payload embeds the TX-<code> reference the bank echoes back.
    let qr = body["qr_image_url"].as_str().unwrap();
    assert!(qr.contains(&format!("addInfo=TX-{code}")));
    assert!(qr.contains("amount=100000"));
}

#[tokio::test]
async fn create_transaction_validates_input() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;

    harness
        .server
        .post("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"amount": 0, "payment_method": "bank_transfer"}))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"amount": -500, "payment_method": "bank_transfer"}))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"amount": 1000, "payment_method": "  "}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn create_transaction_requires_registered_account() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"amount": 1000, "payment_method": "bank_transfer"}))
        .await
        .assert_status_not_found();
}

// ============================================================================
// Webhook reconciliation
// ============================================================================

#[tokio::test]
async fn webhook_completes_transaction_and_credits_balance() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, code) = harness.create_transaction(&harness.user_auth(), 100_000).await;

    let result = harness
        .deliver_webhook(&TestHarness::webhook_payload(&code, 100_000.0))
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["transaction_id"], id);

    // The stored balance and the transaction-log sum agree.
    let (balance, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 100_000);
    assert_eq!(stored, 100_000);

    // The transaction reads back as completed.
    let response = harness
        .server
        .get(&format!("/v1/transactions/{id}"))
        .add_header("authorization", harness.user_auth())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], 1);
}

#[tokio::test]
async fn webhook_redelivery_credits_only_once() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (_, code) = harness.create_transaction(&harness.user_auth(), 100_000).await;
    let payload = TestHarness::webhook_payload(&code, 100_000.0);

    let first = harness.deliver_webhook(&payload).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["message"], "Transaction completed successfully");

    let second = harness.deliver_webhook(&payload).await;
    assert_eq!(second["success"], true);
    assert_eq!(second["message"], "Transaction already completed");

    let (balance, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 100_000);
    assert_eq!(stored, 100_000);
}

#[tokio::test]
async fn concurrent_webhook_redelivery_credits_only_once() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (_, code) = harness.create_transaction(&harness.user_auth(), 50_000).await;
    let payload = TestHarness::webhook_payload(&code, 50_000.0);

    let (a, b) = futures::join!(
        harness.server.post("/webhooks/bank").json(&payload),
        harness.server.post("/webhooks/bank").json(&payload)
    );
    a.assert_status_ok();
    b.assert_status_ok();
    let a: Value = a.json();
    let b: Value = b.json();
    assert_eq!(a["success"], true);
    assert_eq!(b["success"], true);

    let (balance, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 50_000);
    assert_eq!(stored, 50_000);
}

#[tokio::test]
async fn webhook_amount_mismatch_rejected_without_mutation() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, code) = harness.create_transaction(&harness.user_auth(), 100_000).await;

    let result = harness
        .deliver_webhook(&TestHarness::webhook_payload(&code, 99_000.0))
        .await;
    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Amount mismatch");

    // Status and balance are untouched.
    let response = harness
        .server
        .get(&format!("/v1/transactions/{id}"))
        .add_header("authorization", harness.user_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["status"], 0);

    let (balance, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 0);
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn webhook_without_code_token_rejected() {
    let harness = TestHarness::new();

    let mut payload = TestHarness::webhook_payload("unused", 1000.0);
    payload["content"] = json!("regular transfer without reference");
    let result = harness.deliver_webhook(&payload).await;

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Transaction code not found in content");
    assert_eq!(result["transaction_id"], Value::Null);
}

#[tokio::test]
async fn webhook_with_empty_content_rejected() {
    let harness = TestHarness::new();

    let mut payload = TestHarness::webhook_payload("unused", 1000.0);
    payload["content"] = json!("");
    let result = harness.deliver_webhook(&payload).await;

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Empty content");
}

#[tokio::test]
async fn webhook_with_unknown_code_rejected() {
    let harness = TestHarness::new();

    let result = harness
        .deliver_webhook(&TestHarness::webhook_payload("deadbeef0123", 1000.0))
        .await;

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Transaction not found: deadbeef0123");
}

// ============================================================================
// Status updates
// ============================================================================

#[tokio::test]
async fn admin_completion_is_idempotent() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, _) = harness.create_transaction(&harness.user_auth(), 70_000).await;

    for _ in 0..2 {
        let response = harness
            .server
            .put(&format!("/v1/transactions/{id}/status"))
            .add_header("authorization", harness.admin_auth())
            .json(&json!({"status": 1}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], 1);
    }

    let (balance, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 70_000);
    assert_eq!(stored, 70_000);
}

#[tokio::test]
async fn completed_transaction_cannot_be_cancelled() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, code) = harness.create_transaction(&harness.user_auth(), 10_000).await;
    harness
        .deliver_webhook(&TestHarness::webhook_payload(&code, 10_000.0))
        .await;

    let response = harness
        .server
        .put(&format!("/v1/transactions/{id}/status"))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({"status": 3}))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);

    // The credit stays applied.
    let (balance, _) = harness.balance_of(harness.user_id).await;
    assert_eq!(balance, 10_000);
}

#[tokio::test]
async fn status_update_requires_admin_role() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;

    let (id, _) = harness.create_transaction(&harness.user_auth(), 10_000).await;

    harness
        .server
        .put(&format!("/v1/transactions/{id}/status"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"status": 1}))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn out_of_range_status_rejected() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, _) = harness.create_transaction(&harness.user_auth(), 10_000).await;

    harness
        .server
        .put(&format!("/v1/transactions/{id}/status"))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({"status": 7}))
        .await
        .assert_status_bad_request();
}

// ============================================================================
// Listing and visibility
// ============================================================================

#[tokio::test]
async fn listing_is_scoped_to_the_caller() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let other = gofit_core::UserId::generate();
    harness.register(&TestHarness::auth_for(other)).await;

    harness.create_transaction(&harness.user_auth(), 1000).await;
    harness.create_transaction(&TestHarness::auth_for(other), 2000).await;

    // The regular user only sees their own transaction.
    let response = harness
        .server
        .get("/v1/transactions")
        .add_header("authorization", harness.user_auth())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_transactions"], 1);
    assert_eq!(body["results"][0]["amount"], 1000);

    // The admin sees both.
    let response = harness
        .server
        .get("/v1/transactions")
        .add_header("authorization", harness.admin_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_transactions"], 2);

    // Admin can scope to one user.
    let response = harness
        .server
        .get(&format!("/v1/transactions?user_id={other}"))
        .add_header("authorization", harness.admin_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_transactions"], 1);
    assert_eq!(body["results"][0]["amount"], 2000);
}

#[tokio::test]
async fn foreign_transaction_is_forbidden() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;

    let other = gofit_core::UserId::generate();
    harness.register(&TestHarness::auth_for(other)).await;
    let (id, _) = harness
        .create_transaction(&TestHarness::auth_for(other), 1000)
        .await;

    harness
        .server
        .get(&format!("/v1/transactions/{id}"))
        .add_header("authorization", harness.user_auth())
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn soft_deleted_transaction_disappears_from_webhook_matching() {
    let harness = TestHarness::new();
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    let (id, code) = harness.create_transaction(&harness.user_auth(), 5000).await;

    harness
        .server
        .delete(&format!("/v1/transactions/{id}"))
        .add_header("authorization", harness.admin_auth())
        .await
        .assert_status_ok();

    let result = harness
        .deliver_webhook(&TestHarness::webhook_payload(&code, 5000.0))
        .await;
    assert_eq!(result["success"], false);
    assert_eq!(result["message"], format!("Transaction not found: {code}"));
}
