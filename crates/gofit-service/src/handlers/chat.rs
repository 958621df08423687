//! AI chat handlers: conversations, message history, and the ask flow with
//! metered premium-model billing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gofit_core::{ChatMessage, Conversation, ConversationId, UsageRecord};
use gofit_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// System prompt for the coaching assistant.
const SYSTEM_PROMPT: &str = "You are a certified fitness and nutrition coach for the GoFit app. \
     Give practical, evidence-based guidance on training, meals, hydration and recovery, and \
     keep every answer actionable.";

/// Create conversation request.
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional display title; defaults to "Untitled".
    pub title: Option<String>,
}

/// Create a new conversation for the calling principal.
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let caller = auth.account(&state)?;

    let conversation = Conversation::new(caller.user_id, body.title);
    state.store.put_conversation(&conversation)?;

    tracing::info!(
        user_id = %caller.user_id,
        conversation_id = %conversation.id,
        "Conversation created"
    );

    Ok(Json(conversation))
}

/// List the caller's conversations, most recently active first.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let caller = auth.account(&state)?;
    let conversations = state.store.list_conversations(&caller.user_id)?;
    Ok(Json(conversations))
}

/// List a conversation's messages in send order.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(conversation_id): Path<ConversationId>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let caller = auth.account(&state)?;
    let conversation = owned_conversation(&state, &caller, conversation_id)?;

    let messages = state.store.list_messages(&conversation.id)?;
    Ok(Json(messages))
}

/// Ask request.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The user's message.
    pub message: String,
    /// Model selector. The premium model is metered; anything else (or
    /// omitted) uses the free default model.
    pub model: Option<String>,
}

/// Ask response.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// The assistant's reply.
    pub reply: String,
    /// The model that answered.
    pub model: String,
    /// Amount debited, for premium requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<i64>,
    /// Balance after the debit, for premium requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
}

/// Send a message and get an assistant reply.
///
/// Premium-model requests are metered: funds are checked before the
/// external completion call is made (so an underfunded user never incurs
/// external-call cost), and on success the debit and its usage record
/// commit atomically before the reply is stored.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".into()));
    }

    let caller = auth.account(&state)?;
    let conversation = owned_conversation(&state, &caller, conversation_id)?;

    let completion = state
        .completion
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Completion API not configured".into()))?;

    let premium = body
        .model
        .as_ref()
        .is_some_and(|m| m == &state.config.premium_model);

    // Funds gate before any external call or persisted message.
    if premium && !caller.has_sufficient_balance(state.config.premium_model_cost) {
        return Err(ApiError::InsufficientFunds {
            balance: caller.balance,
            required: state.config.premium_model_cost,
        });
    }

    let question = ChatMessage::user(conversation.id, caller.user_id, body.message.clone());
    state.store.append_message(&question)?;

    let model = if premium {
        state.config.premium_model.clone()
    } else {
        state.config.completion_model.clone()
    };

    let reply = completion
        .complete(&model, SYSTEM_PROMPT, &body.message)
        .await
        .map_err(|e| {
            tracing::error!(
                conversation_id = %conversation.id,
                model = %model,
                error = %e,
                "Completion call failed"
            );
            ApiError::ExternalService("Completion request failed".into())
        })?;

    let (cost, balance) = if premium {
        let tokens_used = word_count(&body.message) + word_count(&reply);
        let record = UsageRecord::new(
            caller.user_id,
            Some(conversation.id),
            model.clone(),
            tokens_used,
            state.config.premium_model_cost,
        );

        // Debit and usage record commit together; a concurrent spender can
        // still drain the balance between the gate above and here, in which
        // case the store rejects and nothing is charged.
        let balance = state.store.debit_usage(&record)?;

        tracing::info!(
            user_id = %caller.user_id,
            conversation_id = %conversation.id,
            cost = %record.cost,
            new_balance = %balance,
            "Premium usage debited"
        );

        (Some(record.cost), Some(balance))
    } else {
        (None, None)
    };

    let answer = ChatMessage::assistant(conversation.id, reply.clone());
    state.store.append_message(&answer)?;

    Ok(Json(AskResponse {
        reply,
        model,
        cost,
        balance,
    }))
}

/// Load a live conversation and require the caller to own it.
fn owned_conversation(
    state: &AppState,
    caller: &gofit_core::Account,
    conversation_id: ConversationId,
) -> Result<Conversation, ApiError> {
    let conversation = state
        .store
        .get_conversation(&conversation_id)?
        .ok_or_else(|| ApiError::NotFound(format!("conversation not found: {conversation_id}")))?;

    if conversation.user_id != caller.user_id {
        return Err(ApiError::Forbidden(
            "You can only access your own conversations".into(),
        ));
    }

    Ok(conversation)
}

/// Rough token estimate: whitespace-separated words.
fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("how much protein per day"), 5);
        assert_eq!(word_count("  spaced   out  "), 2);
        assert_eq!(word_count(""), 0);
    }
}
