//! Inference backends - The external completion collaborator
//!
//! Programs never talk to a provider directly; they build a
//! [`CompletionRequest`] and hand it to whatever [`InferenceBackend`] is
//! currently configured. Exactly one backend is active at a time and
//! reconfiguring replaces it atomically for all subsequent executions.
//!
//! Two implementations ship with the crate:
//!
//! - [`HttpBackend`] - OpenAI-compatible chat-completions over HTTP
//! - [`DummyBackend`] - canned responses for offline use and tests

pub mod dummy;
pub mod http;
pub mod prompt;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::program::Demo;

pub use dummy::DummyBackend;
pub use http::HttpBackend;

/// One completion call, fully described
///
/// Carries everything a backend needs to condition the model: the task
/// instructions, the field protocol, few-shot demonstrations, and the
/// structured inputs for this call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Task instructions from the signature
    pub instructions: String,
    /// Input field names, declaration order
    pub input_fields: Vec<String>,
    /// Output field names, declaration order
    pub output_fields: Vec<String>,
    /// Few-shot demonstrations to prepend
    pub demos: Vec<Demo>,
    /// Structured inputs for this call
    pub inputs: HashMap<String, Value>,
    /// Ask the model for a free-text rationale before the outputs
    pub with_reasoning: bool,
}

/// Abstract completion provider
///
/// One `invoke` performs one completion round trip and returns the
/// structured outputs it produced. Transport or provider-side failures
/// surface as `BackendError` with the provider's detail verbatim; the core
/// never retries.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Perform one completion call
    async fn invoke(&self, request: &CompletionRequest) -> Result<HashMap<String, Value>>;

    /// Identity of the underlying model, for logging
    fn model_id(&self) -> &str;
}

/// Process-wide backend configuration
///
/// Mirrors the wire shape of the configure operation. Provider `"dummy"`
/// selects the canned backend; anything else selects the HTTP backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Provider identity (e.g., "openai", "dummy")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identity (e.g., "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,
    /// Credential for the provider; required for HTTP providers
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the provider endpoint (defaults to the OpenAI endpoint)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Canned responses for the dummy provider, cycled per call
    #[serde(default)]
    pub dummy_responses: Vec<HashMap<String, Value>>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            dummy_responses: Vec::new(),
        }
    }
}

impl BackendConfig {
    /// Configuration for the dummy provider with the given canned responses
    pub fn dummy(responses: Vec<HashMap<String, Value>>) -> Self {
        Self {
            provider: "dummy".to_string(),
            model: "dummy".to_string(),
            dummy_responses: responses,
            ..Self::default()
        }
    }

    /// Build the backend this configuration describes
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an HTTP provider is selected without an
    /// api_key. Credential fallback from the environment belongs to the
    /// boundary layer, not here.
    pub fn build(&self) -> Result<Arc<dyn InferenceBackend>> {
        if self.provider == "dummy" {
            tracing::info!(
                "Configured dummy backend ({} canned responses)",
                self.dummy_responses.len()
            );
            return Ok(Arc::new(DummyBackend::new(self.dummy_responses.clone())));
        }

        let api_key = self.api_key.clone().ok_or_else(|| {
            ProxyError::config(format!(
                "API key required for provider '{}'",
                self.provider
            ))
        })?;

        tracing::info!(
            "Configured HTTP backend: provider '{}', model '{}'",
            self.provider,
            self.model
        );

        Ok(Arc::new(HttpBackend::new(
            &self.provider,
            &self.model,
            api_key,
            self.base_url.clone(),
            self.max_tokens,
            self.temperature,
        )))
    }
}
