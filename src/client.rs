//! Probe client abstraction and the HTTP implementation used by the CLI


use crate::{
    cancel::CancelToken,
    error::{AppError, Result},
    session::ProviderTarget,
    types::ProviderEngine,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Error text recorded when a probe was aborted by its cancellation token
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 200;

/// One connectivity check for one model
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub engine: ProviderEngine,
    pub base_url: String,
    pub api_key: String,
    /// Upstream model identifier
    pub model: String,
    pub timeout: Duration,
}

impl ProbeRequest {
    /// Build a request against `target` for the upstream `model`
    pub fn for_target(target: &ProviderTarget, model: &str, timeout: Duration) -> Self {
        Self {
            engine: target.engine,
            base_url: target.base_url.clone(),
            api_key: target.api_key.clone(),
            model: model.to_string(),
            timeout,
        }
    }
}

/// Result of one probe. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn success(latency_ms: u64) -> Self {
        Self {
            success: true,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            latency_ms: None,
            error: Some(message.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self::failure(CANCELLED_MESSAGE)
    }

    pub fn timed_out(timeout: Duration) -> Self {
        Self::failure(format!("timeout after {}s", timeout.as_secs_f64()))
    }

    pub fn is_cancelled(&self) -> bool {
        !self.success && self.error.as_deref() == Some(CANCELLED_MESSAGE)
    }
}

/// Capability that performs one connectivity check.
///
/// Implementations must return promptly once `cancel` is revoked and must not
/// run past `request.timeout`. `Err` is reserved for malformed requests.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn check(&self, request: &ProbeRequest, cancel: &CancelToken) -> Result<ProbeOutcome>;
}

/// Probe client that sends a one-token completion request to the provider
pub struct HttpProbeClient {
    client: Client,
}

impl HttpProbeClient {
    /// Create a probe client with a shared connection pool
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(crate::defaults::MAX_CONCURRENCY)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Resolve the probe endpoint for the request's engine
    pub fn endpoint(request: &ProbeRequest) -> Result<Url> {
        let base = request.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(AppError::invalid_argument("probe base URL is empty"));
        }
        if request.model.trim().is_empty() {
            return Err(AppError::invalid_argument("probe model is empty"));
        }

        let raw = match request.engine {
            ProviderEngine::OpenAi => {
                format!("{}/chat/completions", with_version_segment(base, "v1"))
            }
            ProviderEngine::Anthropic => {
                format!("{}/messages", with_version_segment(base, "v1"))
            }
            ProviderEngine::Gemini => {
                let model = request.model.trim().trim_start_matches("models/");
                format!(
                    "{}/models/{}:generateContent",
                    with_version_segment(base, "v1beta"),
                    model
                )
            }
        };

        let url = Url::parse(&raw)
            .map_err(|e| AppError::invalid_argument(format!("invalid probe URL '{}': {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::invalid_argument(format!(
                "probe URL must use http or https, got '{}'",
                other
            ))),
        }
    }

    /// Minimal request body for the engine
    pub fn request_body(request: &ProbeRequest) -> Value {
        match request.engine {
            ProviderEngine::OpenAi => json!({
                "model": request.model,
                "messages": [{ "role": "user", "content": "hi" }],
                "max_tokens": 1,
                "stream": false,
            }),
            ProviderEngine::Anthropic => json!({
                "model": request.model,
                "messages": [{ "role": "user", "content": "hi" }],
                "max_tokens": 1,
            }),
            ProviderEngine::Gemini => json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": { "maxOutputTokens": 1 },
            }),
        }
    }

    async fn exchange(&self, url: Url, request: &ProbeRequest) -> ProbeOutcome {
        let mut builder = self
            .client
            .post(url)
            .timeout(request.timeout)
            .json(&Self::request_body(request));

        builder = match request.engine {
            ProviderEngine::OpenAi => builder.bearer_auth(&request.api_key),
            ProviderEngine::Anthropic => builder
                .header("x-api-key", &request.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ProviderEngine::Gemini => builder.header("x-goog-api-key", &request.api_key),
        };

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return ProbeOutcome::timed_out(request.timeout),
            Err(e) => return ProbeOutcome::failure(AppError::from(e).to_string()),
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let status = response.status();
        if status.is_success() {
            return ProbeOutcome::success(latency_ms);
        }

        match response.text().await {
            Ok(body) => ProbeOutcome::failure(format!("HTTP {}: {}", status.as_u16(), upstream_error_message(&body))),
            Err(e) => ProbeOutcome::failure(format!("HTTP {}: failed to read response body: {}", status.as_u16(), e)),
        }
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn check(&self, request: &ProbeRequest, cancel: &CancelToken) -> Result<ProbeOutcome> {
        let url = Self::endpoint(request)?;

        if cancel.is_cancelled() {
            return Ok(ProbeOutcome::cancelled());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(ProbeOutcome::cancelled()),
            result = tokio::time::timeout(request.timeout, self.exchange(url, request)) => {
                Ok(result.unwrap_or_else(|_| ProbeOutcome::timed_out(request.timeout)))
            }
        }
    }
}

/// Append `/{version}` unless the base already ends with it
fn with_version_segment(base: &str, version: &str) -> String {
    if base.rsplit('/').next() == Some(version) {
        base.to_string()
    } else {
        format!("{}/{}", base, version)
    }
}

/// Pull a readable message out of an upstream error body
fn upstream_error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("error").filter(|e| e.is_string()))
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_ERROR_BODY_CHARS {
        message.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>() + "..."
    } else if message.is_empty() {
        "empty response body".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(engine: ProviderEngine, base: &str, model: &str) -> ProbeRequest {
        ProbeRequest {
            engine,
            base_url: base.to_string(),
            api_key: "sk-test".to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_openai_endpoint() {
        let url = HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "https://api.openai.com/", "gpt-4o")).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let url = HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "https://proxy.local/v1", "gpt-4o")).unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/v1/chat/completions");
    }

    #[test]
    fn test_anthropic_endpoint() {
        let url = HttpProbeClient::endpoint(&request(ProviderEngine::Anthropic, "https://api.anthropic.com", "claude")).unwrap();
        assert_eq!(url.as_str(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_gemini_endpoint() {
        let url = HttpProbeClient::endpoint(&request(
            ProviderEngine::Gemini,
            "https://generativelanguage.googleapis.com/v1beta",
            "models/gemini-1.5-flash",
        ))
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_malformed_requests_rejected() {
        assert!(matches!(
            HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "", "gpt-4o")),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "not a url", "gpt-4o")),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "ftp://host", "gpt-4o")),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            HttpProbeClient::endpoint(&request(ProviderEngine::OpenAi, "https://host", " ")),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_request_bodies() {
        let body = HttpProbeClient::request_body(&request(ProviderEngine::OpenAi, "https://h", "gpt-4o"));
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1);

        let body = HttpProbeClient::request_body(&request(ProviderEngine::Gemini, "https://h", "gemini"));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_upstream_error_message() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"message":"invalid api key","type":"auth"}}"#),
            "invalid api key"
        );
        assert_eq!(upstream_error_message(r#"{"error":"model not found"}"#), "model not found");
        assert_eq!(upstream_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(upstream_error_message(""), "empty response body");

        let long = "x".repeat(500);
        assert_eq!(upstream_error_message(&long).chars().count(), MAX_ERROR_BODY_CHARS + 3);
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(ProbeOutcome::cancelled().is_cancelled());
        assert!(!ProbeOutcome::failure("HTTP 500").is_cancelled());
        assert_eq!(ProbeOutcome::success(12).latency_ms, Some(12));
        assert_eq!(
            ProbeOutcome::timed_out(Duration::from_secs(30)).error.as_deref(),
            Some("timeout after 30s")
        );
    }
}
