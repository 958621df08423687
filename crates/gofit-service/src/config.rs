//! Service configuration.

use gofit_core::UserId;

/// Default flat cost of one premium-model chat request, in minor currency
/// units.
const DEFAULT_PREMIUM_MODEL_COST: i64 = 500;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/gofit").
    pub data_dir: String,

    /// HS256 secret for validating bearer tokens.
    pub jwt_secret: String,

    /// Users granted the admin role at registration.
    pub admin_users: Vec<UserId>,

    /// Optional shared secret for bank webhook signature verification.
    /// When unset the webhook endpoint accepts unsigned notifications.
    pub webhook_secret: Option<String>,

    /// Bank short name used in the QR image path (default: "MBBank").
    pub bank_code: String,

    /// Receiving bank account number.
    pub bank_account_number: String,

    /// Receiving account holder name, embedded in the QR payload.
    pub bank_account_name: String,

    /// Completion API base URL (optional; chat endpoints return 502 without it).
    pub completion_api_url: Option<String>,

    /// Completion API key (optional).
    pub completion_api_key: Option<String>,

    /// Model used for free chat requests.
    pub completion_model: String,

    /// Identifier of the metered premium model.
    pub premium_model: String,

    /// Flat cost of one premium-model request, in minor currency units.
    pub premium_model_cost: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set - using an insecure development secret");
            "insecure-dev-secret".into()
        });

        let admin_users = std::env::var("ADMIN_USERS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/gofit".into()),
            jwt_secret,
            admin_users,
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok(),
            bank_code: std::env::var("BANK_CODE").unwrap_or_else(|_| "MBBank".into()),
            bank_account_number: std::env::var("BANK_ACCOUNT_NUMBER")
                .unwrap_or_else(|_| "1663999999999".into()),
            bank_account_name: std::env::var("BANK_ACCOUNT_NAME")
                .unwrap_or_else(|_| "GoFit JSC".into()),
            completion_api_url: std::env::var("COMPLETION_API_URL").ok(),
            completion_api_key: std::env::var("COMPLETION_API_KEY").ok(),
            completion_model: std::env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            premium_model: std::env::var("PREMIUM_MODEL").unwrap_or_else(|_| "gofit-coach".into()),
            premium_model_cost: std::env::var("PREMIUM_MODEL_COST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PREMIUM_MODEL_COST),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/gofit".into(),
            jwt_secret: "insecure-dev-secret".into(),
            admin_users: Vec::new(),
            webhook_secret: None,
            bank_code: "MBBank".into(),
            bank_account_number: "1663999999999".into(),
            bank_account_name: "GoFit JSC".into(),
            completion_api_url: None,
            completion_api_key: None,
            completion_model: "gpt-4o-mini".into(),
            premium_model: "gofit-coach".into(),
            premium_model_cost: DEFAULT_PREMIUM_MODEL_COST,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
