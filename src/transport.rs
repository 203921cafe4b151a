//! Model transport client.
//!
//! The summarization orchestrator talks to language models through the
//! [`ChatTransport`] trait; the concrete implementation posts to an
//! OpenAI-compatible chat-completions endpoint (a gateway routing every
//! configured candidate name). Transport is a black box here: it returns a
//! raw JSON payload or an error, and the orchestrator owns parsing and
//! validation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::SummarizeConfig;

/// Errors surfaced while calling a model candidate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint unreachable or request failed in flight.
    #[error("model endpoint unreachable: {0}")]
    Unreachable(String),
    /// Endpoint answered with a non-success status.
    #[error("model call failed: {0}")]
    CallFailed(String),
    /// Response body was not decodable JSON.
    #[error("malformed model response: {0}")]
    InvalidResponse(String),
}

/// One chat-completion invocation.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Interface the orchestrator uses to invoke a model.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Value, TransportError>;
}

/// Build a transport based on configuration. `None` when summarization is
/// disabled — the orchestrator then goes straight to the deterministic
/// fallback.
pub fn create_transport(config: &SummarizeConfig) -> Option<Box<dyn ChatTransport>> {
    if !config.is_enabled() {
        return None;
    }
    Some(Box::new(OpenAiCompatTransport::new(config)))
}

/// Transport for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiCompatTransport {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatTransport {
    pub fn new(config: &SummarizeConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("kb-ingest/summary")
            .build()
            .expect("Failed to construct reqwest::Client for summarization");
        Self {
            http,
            base_url: config.endpoint_url.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatTransport for OpenAiCompatTransport {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Value, TransportError> {
        let payload = json!({
            "model": request.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let mut builder = self.http.post(self.endpoint()).json(&payload);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await.map_err(|error| {
            TransportError::Unreachable(format!(
                "failed to reach {}: {}",
                self.base_url, error
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::CallFailed(format!(
                "endpoint returned {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        response.json::<Value>().await.map_err(|error| {
            TransportError::InvalidResponse(format!("failed to decode response body: {}", error))
        })
    }
}
