//! Bank webhook handler.
//!
//! The payment rail delivers transfer notifications at-least-once, so this
//! endpoint must be safe under arbitrary (and concurrent) redelivery. It
//! never answers with an error status: every outcome is a well-formed
//! `{success, message, transaction_id}` envelope, because a transport-level
//! error would put the rail into an unbounded retry loop.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use gofit_core::TransactionStatus;
use gofit_store::{Store, StoreError};

use crate::bank;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::state::AppState;

/// Absolute tolerance when comparing the webhook's decimal transfer amount
/// against the stored integer amount. Absorbs floating-point representation
/// noise only; anything larger is a mismatch.
const AMOUNT_TOLERANCE: f64 = 0.01;

/// Bank transfer notification payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankWebhook {
    /// Bank gateway tag.
    pub gateway: String,
    /// Transfer timestamp as reported by the bank.
    pub transaction_date: String,
    /// Receiving account number.
    pub account_number: String,
    /// Optional sub-account.
    #[serde(default)]
    pub sub_account: Option<String>,
    /// Bank-side code, unrelated to the payment reference.
    #[serde(default)]
    pub code: Option<String>,
    /// Free-text transfer description; parsed for the `TX<code>` token.
    pub content: String,
    /// Transfer direction tag.
    pub transfer_type: String,
    /// Bank-side description.
    pub description: String,
    /// Transferred amount as a decimal.
    pub transfer_amount: f64,
    /// Bank reference code.
    pub reference_code: String,
    /// Accumulated account balance at the bank.
    pub accumulated: f64,
    /// Notification id.
    pub id: i64,
}

/// Webhook response envelope.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the business effect was applied (or had already been).
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// The matched transaction, when one was found.
    pub transaction_id: Option<String>,
}

impl WebhookResponse {
    fn rejected(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: message.into(),
            transaction_id: None,
        })
    }
}

/// Process a bank transfer notification.
///
/// The endpoint is public: trust is placed in the amount-match and
/// code-lookup checks, plus an optional HMAC signature when a webhook
/// secret is configured.
pub async fn bank_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Json<WebhookResponse> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let expected = hmac_sha256_hex(secret, &body);
        if !constant_time_eq(&expected, signature) {
            tracing::warn!("Invalid bank webhook signature");
            return WebhookResponse::rejected("Invalid signature");
        }
    }

    let webhook: BankWebhook = match serde_json::from_str(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed bank webhook payload");
            return WebhookResponse::rejected("Malformed payload");
        }
    };

    tracing::info!(
        gateway = %webhook.gateway,
        notification_id = %webhook.id,
        reference_code = %webhook.reference_code,
        "Received bank webhook"
    );

    if webhook.content.is_empty() {
        return WebhookResponse::rejected("Empty content");
    }

    let Some(code) = bank::extract_payment_code(&webhook.content) else {
        tracing::warn!(content = %webhook.content, "Transaction code not found in content");
        return WebhookResponse::rejected("Transaction code not found in content");
    };

    let transaction = match state.store.find_transaction_by_code(code) {
        Ok(Some(transaction)) => transaction,
        Ok(None) => {
            tracing::warn!(code = %code, "Transaction not found for webhook code");
            return WebhookResponse::rejected(format!("Transaction not found: {code}"));
        }
        Err(e) => {
            tracing::error!(code = %code, error = %e, "Webhook transaction lookup failed");
            return WebhookResponse::rejected("Internal server error");
        }
    };

    // Amount gate: a mismatch indicates fraud or a data error and is kept
    // for manual review, so log before rejecting.
    #[allow(clippy::cast_precision_loss)]
    let difference = (transaction.amount as f64 - webhook.transfer_amount).abs();
    if difference > AMOUNT_TOLERANCE {
        tracing::warn!(
            code = %code,
            expected = %transaction.amount,
            received = %webhook.transfer_amount,
            "Webhook amount mismatch"
        );
        return Json(WebhookResponse {
            success: false,
            message: "Amount mismatch".into(),
            transaction_id: Some(transaction.id.to_string()),
        });
    }

    // The completion path re-checks the status under the account lock, so a
    // redelivered (or concurrently delivered) notification credits at most
    // once.
    match state
        .store
        .update_transaction_status(&transaction.id, TransactionStatus::Completed)
    {
        Ok(outcome) if outcome.already_completed => Json(WebhookResponse {
            success: true,
            message: "Transaction already completed".into(),
            transaction_id: Some(transaction.id.to_string()),
        }),
        Ok(outcome) => {
            tracing::info!(
                transaction_id = %transaction.id,
                code = %code,
                credited = ?outcome.credited,
                new_balance = ?outcome.new_balance,
                "Transaction completed via webhook"
            );
            Json(WebhookResponse {
                success: true,
                message: "Transaction completed successfully".into(),
                transaction_id: Some(transaction.id.to_string()),
            })
        }
        Err(StoreError::NotFound { entity, .. }) => Json(WebhookResponse {
            success: false,
            message: format!("{entity} not found"),
            transaction_id: Some(transaction.id.to_string()),
        }),
        Err(e) => {
            // Full rollback already happened inside the store; the rail may
            // retry safely.
            tracing::error!(
                transaction_id = %transaction.id,
                error = %e,
                "Webhook processing error"
            );
            Json(WebhookResponse {
                success: false,
                message: "Internal server error".into(),
                transaction_id: Some(transaction.id.to_string()),
            })
        }
    }
}
