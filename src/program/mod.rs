//! Prompt programs - Executable prediction strategies bound to a signature
//!
//! A [`Program`] pairs one signature with one prediction strategy and runs a
//! single backend call per prediction. A [`CompiledModule`] is a program
//! snapshot produced by the optimizer: the same signature and strategy plus
//! the demonstrations that passed the metric, prepended to every subsequent
//! call as few-shot exemplars.
//!
//! # Architecture
//!
//! ```text
//! PredictRequest inputs
//!     ↓
//! Program::execute()
//!     ↓
//! CompletionRequest (instructions + demos + inputs)
//!     ↓
//! InferenceBackend::invoke()
//!     ↓
//! Prediction (signature outputs + optional reasoning)
//! ```

pub mod store;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{CompletionRequest, InferenceBackend};
use crate::error::{ProxyError, Result};
use crate::signature::Signature;

pub use store::ModuleStore;

/// Name of the synthetic rationale field produced by reasoning-augmented
/// programs. Not part of any signature contract.
pub const REASONING_FIELD: &str = "reasoning";

/// Prediction strategy
///
/// Determines how a program prompts the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One call, inputs straight to outputs
    #[default]
    Direct,
    /// Elicits a free-text rationale before the final outputs
    ReasoningAugmented,
}

impl Strategy {
    /// Whether this strategy asks the backend for a rationale
    pub fn with_reasoning(&self) -> bool {
        matches!(self, Self::ReasoningAugmented)
    }
}

impl FromStr for Strategy {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(Self::Direct),
            "reasoning_augmented" | "reasoning-augmented" => Ok(Self::ReasoningAugmented),
            other => Err(ProxyError::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::ReasoningAugmented => write!(f, "reasoning_augmented"),
        }
    }
}

/// Few-shot demonstration
///
/// A training example accepted by the optimizer, carrying the teacher
/// program's generated rationale when one was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demo {
    /// Input field values
    pub inputs: HashMap<String, Value>,
    /// Expected output field values
    pub outputs: HashMap<String, Value>,
    /// Rationale generated by the teacher program, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Demo {
    /// Create a demonstration without a rationale
    pub fn new(inputs: HashMap<String, Value>, outputs: HashMap<String, Value>) -> Self {
        Self {
            inputs,
            outputs,
            reasoning: None,
        }
    }

    /// Attach a rationale
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Result of one program execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Values of the signature's output fields
    pub outputs: HashMap<String, Value>,
    /// Rationale surfaced alongside outputs for reasoning-augmented runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// An executable prediction strategy bound to one signature
///
/// Stateless with respect to prior calls; demos are only ever present on
/// programs reconstructed from a compiled module.
#[derive(Debug, Clone)]
pub struct Program {
    signature: Arc<Signature>,
    strategy: Strategy,
    demos: Vec<Demo>,
}

impl Program {
    /// Build a fresh program with no demonstrations
    pub fn new(signature: Arc<Signature>, strategy: Strategy) -> Self {
        Self {
            signature,
            strategy,
            demos: Vec::new(),
        }
    }

    /// Attach demonstrations (used when executing a compiled module)
    pub fn with_demos(mut self, demos: Vec<Demo>) -> Self {
        self.demos = demos;
        self
    }

    /// The bound signature
    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    /// The bound strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Run one prediction through the backend
    ///
    /// Issues exactly one backend call. The returned prediction carries the
    /// signature's output fields verbatim; for reasoning-augmented runs the
    /// rationale is surfaced separately.
    pub async fn execute(
        &self,
        backend: &dyn InferenceBackend,
        inputs: &HashMap<String, Value>,
    ) -> Result<Prediction> {
        let request = CompletionRequest {
            instructions: self.signature.instructions.clone(),
            input_fields: self
                .signature
                .input_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_fields: self
                .signature
                .output_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            demos: self.demos.clone(),
            inputs: inputs.clone(),
            with_reasoning: self.strategy.with_reasoning(),
        };

        tracing::debug!(
            "Executing {} program for signature '{}' with {} demos",
            self.strategy,
            self.signature.name,
            self.demos.len()
        );

        let mut raw = backend.invoke(&request).await?;

        // The rationale is only synthetic for reasoning-augmented runs; a
        // signature may legitimately declare an output field by the same
        // name, in which case it belongs to the contract verbatim.
        let reasoning = if self.strategy.with_reasoning()
            && !self.signature.output_names().contains(&REASONING_FIELD)
        {
            raw.remove(REASONING_FIELD)
                .and_then(|v| v.as_str().map(|s| s.to_string()))
        } else {
            None
        };

        let mut outputs = HashMap::new();
        for field in self.signature.output_names() {
            if let Some(value) = raw.remove(field) {
                outputs.insert(field.to_string(), value);
            }
        }

        Ok(Prediction { outputs, reasoning })
    }
}

/// A program snapshot produced by the optimizer
///
/// Immutable after creation; referenced by id from predict/evaluate calls.
/// Carries its own `Arc<Signature>` snapshot, so a later re-registration of
/// the signature name does not change what the module executes against.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// Generated id, unique within the process (`"<name>_opt_<count>"`)
    pub module_id: String,
    /// Signature snapshot the module was optimized against
    pub signature: Arc<Signature>,
    /// Strategy the module executes with
    pub strategy: Strategy,
    /// Demonstrations prepended to every call
    pub demos: Vec<Demo>,
}

impl CompiledModule {
    /// Reconstruct the executable program for this module
    pub fn program(&self) -> Program {
        Program::new(Arc::clone(&self.signature), self.strategy).with_demos(self.demos.clone())
    }

    /// Number of demonstrations carried
    pub fn demo_count(&self) -> usize {
        self.demos.len()
    }
}
