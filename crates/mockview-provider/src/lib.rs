pub mod gemini;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiProvider;
pub use types::*;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
}

// ============================================================
// Error classification
// ============================================================

/// Coarse class of a provider failure, derived from the HTTP status or error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimit,
    AuthError,
    InvalidRequest,
    ServerError,
    Timeout,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Classify a formatted provider error such as `"gemini api error (429 Too Many Requests) [retryable]: ..."`.
    pub fn classify(err_str: &str) -> Self {
        let lower = err_str.to_lowercase();

        if lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("resource_exhausted")
        {
            return Self::RateLimit;
        }

        if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
            return Self::Timeout;
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("api key not valid")
        {
            return Self::AuthError;
        }

        if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("internal server error")
            || lower.contains("service unavailable")
        {
            return Self::ServerError;
        }

        if lower.contains("400") || lower.contains("422") || lower.contains("invalid argument") {
            return Self::InvalidRequest;
        }

        Self::Unknown
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::InvalidRequest => "invalid_request",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================
// Provider Configuration
// ============================================================

/// Provider type identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    /// Offline provider that never produces text. Every stage runs its fallback path.
    Stub,
}

fn default_timeout_secs() -> u64 {
    60
}

/// Connection settings for the text-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom base URL (optional, uses the public endpoint by default)
    #[serde(default)]
    pub base_url: Option<String>,
    /// HTTP(S) proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            proxy: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::Gemini => {
            let key = config
                .api_key
                .as_ref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| anyhow!("gemini requires api_key"))?;
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(gemini::GEMINI_API_BASE);

            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .connect_timeout(Duration::from_secs(15));
            if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
                builder = builder.proxy(
                    reqwest::Proxy::all(proxy)
                        .map_err(|e| anyhow!("invalid proxy url {proxy}: {e}"))?,
                );
            }
            let client = builder.build()?;
            Arc::new(GeminiProvider::with_client(key.clone(), base_url, client))
        }
        ProviderType::Stub => Arc::new(StubProvider),
    };
    tracing::info!("created provider ({:?})", config.provider_type);
    Ok(provider)
}

// ============================================================
// Stub Provider
// ============================================================

pub struct StubProvider;

#[async_trait]
impl LlmProvider for StubProvider {
    async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse {
            text: String::new(),
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".into()),
        })
    }
}
