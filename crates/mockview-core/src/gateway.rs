use std::sync::Arc;
use std::time::Duration;

use mockview_provider::{LlmProvider, LlmRequest, ProviderErrorKind};
use tokio::time;

/// Linear backoff applied to rate-limited calls only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub step_delay: Duration,
}

impl RetryPolicy {
    /// Wait before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay + self.step_delay * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            step_delay: Duration::from_secs(2),
        }
    }
}

/// `generate(prompt, temperature) -> text` over a provider.
///
/// Never fails: once retries are exhausted, or on any error that is not a
/// rate limit, the failure is logged and an empty string is returned.
pub struct Gateway {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl Gateway {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 4096,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str, temperature: f32) -> String {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let request =
                LlmRequest::simple(self.model.clone(), None, prompt.to_string())
                    .with_temperature(temperature)
                    .with_max_tokens(self.max_tokens);
            tracing::debug!(
                "generate: model={} temperature={temperature} prompt_chars={}",
                self.model,
                prompt.chars().count()
            );

            match self.provider.chat(request).await {
                Ok(resp) => return resp.text,
                Err(err) => {
                    let err_str = err.to_string();
                    let kind = ProviderErrorKind::classify(&err_str);

                    if kind == ProviderErrorKind::RateLimit && attempts < max_attempts {
                        let backoff = self.retry.delay_for(attempts - 1);
                        tracing::warn!(
                            "model {} rate limited (attempt {attempts}/{max_attempts}), backing off {}ms: {err_str}",
                            self.model,
                            backoff.as_millis()
                        );
                        time::sleep(backoff).await;
                        continue;
                    }

                    tracing::warn!(
                        "text generation failed (reason={}, attempts={attempts}): {err_str}",
                        kind.as_str()
                    );
                    return String::new();
                }
            }
        }
    }
}
