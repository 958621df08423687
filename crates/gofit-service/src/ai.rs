//! Completion API client.
//!
//! A thin client over an OpenAI-compatible chat-completions endpoint. The
//! client is constructed once at bootstrap from config and injected through
//! `AppState`; handlers never build their own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout for completion calls. The upstream has no bound of its own, and a
/// stuck call would pin a request worker for its whole duration.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the completion API.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The HTTP request failed (connect error, timeout, ...).
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("completion API returned status {0}")]
    Status(reqwest::StatusCode),

    /// The API answered without any choices.
    #[error("completion response contained no choices")]
    Empty,
}

/// Client for an OpenAI-compatible chat-completions API.
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl CompletionClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Run one completion: system prompt plus a single user message, answer
    /// text out.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails, the API answers with a
    /// non-success status, or the response carries no choices.
    pub async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status));
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CompletionError::Empty)
    }
}
