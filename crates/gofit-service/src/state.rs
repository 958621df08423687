//! Application state.

use std::sync::Arc;

use gofit_store::RocksStore;

use crate::ai::CompletionClient;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Completion API client (optional; chat endpoints answer 502 without it).
    pub completion: Option<Arc<CompletionClient>>,
}

impl AppState {
    /// Create a new application state, building the completion client from
    /// config when one is configured.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let completion = config
            .completion_api_url
            .as_ref()
            .zip(config.completion_api_key.as_ref())
            .and_then(|(url, key)| match CompletionClient::new(url, key) {
                Ok(client) => {
                    tracing::info!(completion_url = %url, "Completion API enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create completion client");
                    None
                }
            });

        if completion.is_none() {
            tracing::warn!("Completion API not configured - chat endpoints will be unavailable");
        }

        Self {
            store,
            config,
            completion,
        }
    }
}
