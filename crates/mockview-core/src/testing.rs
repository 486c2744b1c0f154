//! Test doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockview_provider::{LlmProvider, LlmRequest, LlmResponse};

use crate::gateway::Gateway;

/// Returns the same text for every call and records each prompt.
pub struct Canned {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, Option<f32>)>>,
}

impl Canned {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(p, _)| p.clone())
            .unwrap_or_default()
    }

    pub fn last_temperature(&self) -> Option<f32> {
        self.prompts.lock().unwrap().last().and_then(|(_, t)| *t)
    }
}

#[async_trait]
impl LlmProvider for Canned {
    async fn chat(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push((prompt, request.temperature));
        Ok(LlmResponse {
            text: self.reply.clone(),
            input_tokens: None,
            output_tokens: None,
            stop_reason: None,
        })
    }
}

/// Fails every call with a non-retryable error.
pub struct Broken;

#[async_trait]
impl LlmProvider for Broken {
    async fn chat(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
        anyhow::bail!("gemini api error (400 Bad Request): invalid argument")
    }
}

pub fn gateway(provider: Arc<dyn LlmProvider>) -> Gateway {
    Gateway::new(provider, "test-model")
}
