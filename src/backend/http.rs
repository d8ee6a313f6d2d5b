//! HTTP inference backend
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. The request is
//! rendered by [`prompt::render_messages`](super::prompt::render_messages)
//! and the completion text parsed back into the expected output fields.
//! Provider-side failures are surfaced verbatim; retry policy, if any,
//! belongs to the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ProxyError, Result};

use super::prompt::{parse_completion, render_messages};
use super::{CompletionRequest, InferenceBackend};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions backend
pub struct HttpBackend {
    /// Provider-qualified model string sent on the wire
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for a provider/model pair
    ///
    /// Models without a provider prefix get one, so `gpt-4o-mini` under
    /// provider `openai` goes over the wire as `openai/gpt-4o-mini` when a
    /// custom gateway endpoint is configured; against the default OpenAI
    /// endpoint the bare model name is used.
    pub fn new(
        provider: &str,
        model: &str,
        api_key: String,
        base_url: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        let gateway = base_url.is_some();
        let model = if gateway && !model.contains('/') {
            format!("{}/{}", provider, model)
        } else {
            model.to_string()
        };

        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_tokens,
            temperature,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn invoke(&self, request: &CompletionRequest) -> Result<HashMap<String, Value>> {
        let messages: Vec<Value> = render_messages(request)
            .into_iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        tracing::debug!(
            "Invoking model '{}' ({} messages)",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProxyError::backend(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "no response body".to_string());
            tracing::warn!("Provider returned {}: {}", status, detail);
            return Err(ProxyError::backend(format!("{}: {}", status, detail)));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProxyError::backend(format!("malformed response: {}", e)))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProxyError::backend("response missing completion content"))?;

        parse_completion(content, &request.output_fields, request.with_reasoning)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
