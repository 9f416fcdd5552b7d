//! Client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the REST connector.
///
/// The base URL is overridable so tests can point the connector at a mock
/// server. Credential handling beyond the API key header (TLS, proxies) is
/// the HTTP stack's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the tenant's API (e.g. `https://<tenant>.lendbase.cloud/api`).
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
    /// Maximum physical attempts per request, transient failures included.
    pub max_attempts: u32,
    /// Fixed backoff between retries (milliseconds).
    pub retry_backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.lendbase.cloud/api".to_string(),
            api_key: String::new(),
            user_agent: concat!("lendbase-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 60,
            max_attempts: 5,
            retry_backoff_ms: 1_000,
        }
    }
}
