//! HTTP transport abstraction and the reqwest-backed connector.

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-call context threaded through transport, retry and pagination.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    /// Absolute point after which no further physical request is issued.
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Whether the deadline has elapsed.
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Abstract HTTP interface to the platform.
///
/// Paths are relative to the configured base URL; bodies and responses are
/// raw wire JSON. Implementations own failure classification and retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)], ctx: &CallContext)
    -> ApiResult<Value>;

    async fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
        ctx: &CallContext,
    ) -> ApiResult<Value>;

    async fn put(&self, path: &str, body: &Value, ctx: &CallContext) -> ApiResult<Value>;

    async fn patch(&self, path: &str, body: &Value, ctx: &CallContext) -> ApiResult<Value>;

    async fn delete(&self, path: &str, ctx: &CallContext) -> ApiResult<()>;
}

/// Structured error body returned by the platform.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(rename = "errorCode", default)]
    code: Option<i64>,
    #[serde(rename = "errorReason", default)]
    reason: Option<String>,
}

/// REST connector over `reqwest`.
///
/// Every physical attempt goes through the retry policy: 502/503/504 sleep
/// the fixed backoff and retry up to the configured bound, success bodies
/// that fail to parse are malformed-response errors, other failure statuses
/// map to business/not-found errors, and transport-level errors propagate
/// immediately. None of the non-transient classes is ever retried.
pub struct RestConnector {
    config: ApiConfig,
    client: Client,
    retry: RetryPolicy,
}

impl RestConnector {
    /// Creates a connector for the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("failed to create HTTP client");
        let retry = RetryPolicy::from_config(&config);

        Self {
            config,
            client,
            retry,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        ctx: &CallContext,
    ) -> ApiResult<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut attempt = 0u32;

        loop {
            if ctx.expired() {
                return Err(ApiError::DeadlineExceeded);
            }
            attempt += 1;

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("apikey", &self.config.api_key);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!("{} {} (attempt {})", method, path, attempt);
            let response = request.send().await?;
            let status = response.status();

            if RetryPolicy::is_transient_status(status.as_u16()) {
                if self.retry.should_retry(attempt) && !ctx.expired() {
                    warn!(
                        "{} {} returned {}, retrying after {:?}",
                        method, path, status, self.retry.backoff
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    continue;
                }
                return Err(ApiError::Communication {
                    attempts: attempt,
                    reason: format!("HTTP {status}"),
                });
            }

            if status.is_success() {
                let bytes = response.bytes().await?;
                if bytes.is_empty() {
                    return Ok(Value::Null);
                }
                return serde_json::from_slice(&bytes)
                    .map_err(|e| ApiError::MalformedResponse(format!("invalid JSON body: {e}")));
            }

            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(path.to_string()));
            }
            return Err(classify_failure(status.as_u16(), &text));
        }
    }
}

/// Maps a non-transient failure body into the error taxonomy.
fn classify_failure(status: u16, body: &str) -> ApiError {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(entry) = parsed.errors.first() {
            return ApiError::Business {
                code: entry
                    .code
                    .map_or_else(|| status.to_string(), |c| c.to_string()),
                reason: entry.reason.clone().unwrap_or_default(),
            };
        }
    }
    ApiError::Business {
        code: status.to_string(),
        reason: body.to_string(),
    }
}

#[async_trait]
impl Transport for RestConnector {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        ctx: &CallContext,
    ) -> ApiResult<Value> {
        self.execute(Method::GET, path, query, None, ctx).await
    }

    async fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
        ctx: &CallContext,
    ) -> ApiResult<Value> {
        self.execute(Method::POST, path, query, Some(body), ctx)
            .await
    }

    async fn put(&self, path: &str, body: &Value, ctx: &CallContext) -> ApiResult<Value> {
        self.execute(Method::PUT, path, &[], Some(body), ctx).await
    }

    async fn patch(&self, path: &str, body: &Value, ctx: &CallContext) -> ApiResult<Value> {
        self.execute(Method::PATCH, path, &[], Some(body), ctx).await
    }

    async fn delete(&self, path: &str, ctx: &CallContext) -> ApiResult<()> {
        self.execute(Method::DELETE, path, &[], None, ctx).await?;
        Ok(())
    }
}
