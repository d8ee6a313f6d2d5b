//! Dummy inference backend
//!
//! Cycles through a list of canned output maps, one per invocation, never
//! touching the network. Used for offline runs and for every test that
//! exercises the prediction or optimization pipeline. Each response is
//! filtered to the fields the request actually expects, so one canned map
//! like `{"answer": "42", "reasoning": "because"}` serves both strategies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::program::REASONING_FIELD;

use super::{CompletionRequest, InferenceBackend};

/// Canned-response backend
pub struct DummyBackend {
    responses: Vec<HashMap<String, Value>>,
    cursor: Mutex<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl DummyBackend {
    /// Create a backend cycling through `responses`
    ///
    /// An empty list behaves like a single empty response.
    pub fn new(responses: Vec<HashMap<String, Value>>) -> Self {
        Self {
            responses,
            cursor: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a backend that always returns the same response
    pub fn fixed(response: HashMap<String, Value>) -> Self {
        Self::new(vec![response])
    }

    /// Number of invocations seen so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recent request, if any (test introspection)
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl InferenceBackend for DummyBackend {
    async fn invoke(&self, request: &CompletionRequest) -> Result<HashMap<String, Value>> {
        self.requests.lock().unwrap().push(request.clone());

        let response = if self.responses.is_empty() {
            HashMap::new()
        } else {
            let mut cursor = self.cursor.lock().unwrap();
            let response = self.responses[*cursor % self.responses.len()].clone();
            *cursor += 1;
            response
        };

        let mut outputs: HashMap<String, Value> = response
            .iter()
            .filter(|(name, _)| request.output_fields.iter().any(|f| f == *name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if request.with_reasoning {
            if let Some(reasoning) = response.get(REASONING_FIELD) {
                outputs.insert(REASONING_FIELD.to_string(), reasoning.clone());
            }
        }

        Ok(outputs)
    }

    fn model_id(&self) -> &str {
        "dummy"
    }
}
