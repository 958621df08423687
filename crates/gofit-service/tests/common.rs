//! Common test utilities for gofit-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use gofit_core::UserId;
use gofit_service::{create_router, AppState, ServiceConfig};
use gofit_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A regular test user.
    pub user_id: UserId,
    /// A user configured as admin.
    pub admin_id: UserId,
}

impl TestHarness {
    /// Create a harness with a fresh database and no completion API.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness whose completion client points at the given base URL
    /// (usually a wiremock server).
    pub fn with_completion(base_url: &str) -> Self {
        Self::build(Some(base_url.to_string()))
    }

    fn build(completion_api_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let admin_id = UserId::generate();
        let completion_api_key = completion_api_url.as_ref().map(|_| "test-key".to_string());

        let config = ServiceConfig {
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            jwt_secret: "test-secret".into(),
            admin_users: vec![admin_id],
            completion_api_url,
            completion_api_key,
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            user_id: UserId::generate(),
            admin_id,
        }
    }

    /// Authorization header for the regular test user.
    pub fn user_auth(&self) -> String {
        format!("Bearer test-token:{}", self.user_id)
    }

    /// Authorization header for the admin test user.
    pub fn admin_auth(&self) -> String {
        format!("Bearer test-token:{}", self.admin_id)
    }

    /// Authorization header for an arbitrary user.
    pub fn auth_for(user_id: UserId) -> String {
        format!("Bearer test-token:{user_id}")
    }

    /// Register an account for the given auth header.
    pub async fn register(&self, auth: &str) -> Value {
        let response = self
            .server
            .post("/v1/accounts")
            .add_header("authorization", auth)
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Create a pending transaction and return `(transaction_id, code)`.
    pub async fn create_transaction(&self, auth: &str, amount: i64) -> (String, String) {
        let response = self
            .server
            .post("/v1/transactions")
            .add_header("authorization", auth)
            .json(&json!({
                "amount": amount,
                "payment_method": "bank_transfer"
            }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();

        let id = body["transaction"]["id"].as_str().unwrap().to_string();
        let code = body["transaction"]["code"].as_str().unwrap().to_string();
        (id, code)
    }

    /// Build a bank webhook payload whose content embeds `TX<code>`.
    #[allow(clippy::cast_precision_loss)]
    pub fn webhook_payload(code: &str, transfer_amount: f64) -> Value {
        json!({
            "gateway": "MBBank",
            "transactionDate": "2025-06-01 10:15:00",
            "accountNumber": "1663999999999",
            "subAccount": null,
            "code": null,
            "content": format!("GOFIT TX{code} chuyen tien"),
            "transferType": "in",
            "description": "bank transfer",
            "transferAmount": transfer_amount,
            "referenceCode": "FT123456789",
            "accumulated": 0.0,
            "id": 9001
        })
    }

    /// Deliver a webhook payload and return the response envelope.
    pub async fn deliver_webhook(&self, payload: &Value) -> Value {
        let response = self.server.post("/webhooks/bank").json(payload).await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch a user's reconciled balance as the admin. Returns
    /// `(balance, stored_balance)`.
    pub async fn balance_of(&self, user_id: UserId) -> (i64, i64) {
        let response = self
            .server
            .get(&format!("/v1/users/{user_id}/balance"))
            .add_header("authorization", self.admin_auth())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        (
            body["balance"].as_i64().unwrap(),
            body["stored_balance"].as_i64().unwrap(),
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
