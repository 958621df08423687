//! AI chat and usage metering integration tests.
//!
//! The completion API is mocked with wiremock; the harness's completion
//! client points at the mock server.

mod common;

use common::TestHarness;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPLY: &str = "Aim for about 2.5 liters of water per day.";

/// Start a mock completion API answering every request with `REPLY`.
async fn mock_completion_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": REPLY}}]
        })))
        .mount(&server)
        .await;
    server
}

/// Register the user and admin, fund the user's wallet through the webhook
/// flow, and create a conversation. Returns the conversation id.
async fn funded_conversation(harness: &TestHarness, amount: i64) -> String {
    harness.register(&harness.user_auth()).await;
    harness.register(&harness.admin_auth()).await;

    if amount > 0 {
        let (_, code) = harness.create_transaction(&harness.user_auth(), amount).await;
        let result = harness
            .deliver_webhook(&TestHarness::webhook_payload(&code, amount as f64))
            .await;
        assert_eq!(result["success"], true);
    }

    let response = harness
        .server
        .post("/v1/conversations")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"title": "Hydration"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn free_chat_replies_without_charging() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 0).await;

    let response = harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "How much water should I drink?"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reply"], REPLY);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["cost"], Value::Null);

    // No usage record was written.
    let response = harness
        .server
        .get("/v1/usage")
        .add_header("authorization", harness.user_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_usage"], 0);
}

#[tokio::test]
async fn premium_chat_debits_and_records_usage() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 100_000).await;

    let response = harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "Build me a cutting plan", "model": "gofit-coach"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reply"], REPLY);
    assert_eq!(body["model"], "gofit-coach");
    assert_eq!(body["cost"], 500);
    assert_eq!(body["balance"], 99_500);

    // Exactly one usage record with the debited cost.
    let response = harness
        .server
        .get("/v1/usage")
        .add_header("authorization", harness.user_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_usage"], 1);
    assert_eq!(body["results"][0]["cost"], 500);
    assert_eq!(body["results"][0]["model"], "gofit-coach");
    assert_eq!(body["results"][0]["conversation_id"], conversation);

    // Both the question and the reply were persisted.
    let response = harness
        .server
        .get(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .await;
    let messages: Value = response.json();
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[1]["sender"], "assistant");

    // Stats reflect the single premium call.
    let response = harness
        .server
        .get("/v1/usage/stats")
        .add_header("authorization", harness.user_auth())
        .await;
    let stats: Value = response.json();
    assert_eq!(stats["total_cost"], 500);
    assert_eq!(stats["usage_count"], 1);
    assert_eq!(stats["current_balance"], 99_500);
}

#[tokio::test]
async fn premium_chat_rejected_on_insufficient_funds() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 0).await;

    let response = harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "Build me a plan", "model": "gofit-coach"}))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);

    // No usage record, no messages, balance untouched.
    let response = harness
        .server
        .get("/v1/usage")
        .add_header("authorization", harness.user_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_usage"], 0);

    let response = harness
        .server
        .get(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .await;
    let messages: Value = response.json();
    assert!(messages.as_array().unwrap().is_empty());

    let (_, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn failed_completion_is_not_charged() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;

    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 100_000).await;

    let response = harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "Build me a plan", "model": "gofit-coach"}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);

    // The generation failed, so the debit never happened.
    let (_, stored) = harness.balance_of(harness.user_id).await;
    assert_eq!(stored, 100_000);

    let response = harness
        .server
        .get("/v1/usage")
        .add_header("authorization", harness.user_auth())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_usage"], 0);
}

#[tokio::test]
async fn chat_unavailable_without_completion_api() {
    let harness = TestHarness::new();
    let conversation = funded_conversation(&harness, 0).await;

    let response = harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "hello"}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn empty_message_rejected() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 0).await;

    harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "   "}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn foreign_conversation_is_forbidden() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let conversation = funded_conversation(&harness, 0).await;

    let other = gofit_core::UserId::generate();
    harness.register(&TestHarness::auth_for(other)).await;

    harness
        .server
        .post(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", TestHarness::auth_for(other))
        .json(&json!({"message": "hi"}))
        .await
        .assert_status_forbidden();

    harness
        .server
        .get(&format!("/v1/conversations/{conversation}/messages"))
        .add_header("authorization", TestHarness::auth_for(other))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn conversations_list_most_recent_first() {
    let mock = mock_completion_api().await;
    let harness = TestHarness::with_completion(&mock.uri());
    let first = funded_conversation(&harness, 0).await;

    let response = harness
        .server
        .post("/v1/conversations")
        .add_header("authorization", harness.user_auth())
        .json(&json!({"title": "Meal prep"}))
        .await;
    let second: Value = response.json();
    let second_id = second["id"].as_str().unwrap();

    // Activity on the first conversation bumps it back to the top.
    harness
        .server
        .post(&format!("/v1/conversations/{first}/messages"))
        .add_header("authorization", harness.user_auth())
        .json(&json!({"message": "still hydrating?"}))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/conversations")
        .add_header("authorization", harness.user_auth())
        .await;
    let listing: Value = response.json();
    let listing = listing.as_array().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0]["id"], first);
    assert_eq!(listing[1]["id"], second_id);
}
