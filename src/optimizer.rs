//! Bootstrap optimizer - Few-shot demonstration selection
//!
//! The one supported optimizer. A reasoning-augmented teacher program runs
//! over the training set in input order; every example the metric accepts
//! becomes a demonstration (augmented with the teacher's rationale) until
//! `max_demos` are collected. The result is wrapped as a reasoning-augmented
//! compiled module whose demonstrations are prepended to every subsequent
//! call.
//!
//! Fewer than `max_demos` accepted examples is not an error; zero accepted
//! examples degrades the module to an effectively zero-shot
//! reasoning-augmented program, which is still valid.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::backend::InferenceBackend;
use crate::error::{ProxyError, Result};
use crate::metric::Metric;
use crate::program::{Demo, Program, Strategy};
use crate::signature::Signature;

/// Default demonstration cap when the caller does not set one
pub const DEFAULT_MAX_DEMOS: usize = 4;

/// Supported optimizers
///
/// A closed set of one. The name check exists so an unsupported request
/// fails loudly instead of silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimizer {
    /// Bootstrap demonstration selection via a teacher program
    #[default]
    BootstrapFewShot,
}

impl FromStr for Optimizer {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BootstrapFewShot" => Ok(Self::BootstrapFewShot),
            other => Err(ProxyError::UnsupportedOptimizer(other.to_string())),
        }
    }
}

/// One training example, split per the signature's field roles
#[derive(Debug, Clone)]
pub struct TrainExample {
    /// Values of the signature's input fields
    pub inputs: HashMap<String, Value>,
    /// Values of the signature's output fields (the reference)
    pub expected: HashMap<String, Value>,
}

impl TrainExample {
    /// Split a flat field map into inputs and expected outputs
    ///
    /// Fields named as inputs by the signature become inputs; everything
    /// else present in the map is treated as an expected output.
    pub fn from_record(signature: &Signature, record: &HashMap<String, Value>) -> Self {
        let input_names = signature.input_names();

        let mut inputs = HashMap::new();
        let mut expected = HashMap::new();
        for (name, value) in record {
            if input_names.contains(&name.as_str()) {
                inputs.insert(name.clone(), value.clone());
            } else {
                expected.insert(name.clone(), value.clone());
            }
        }

        Self { inputs, expected }
    }
}

/// Run the bootstrap loop and return the accepted demonstrations
///
/// Iteration is strictly sequential, one teacher call per example, so
/// demonstration order and count are deterministic given a deterministic
/// backend. A backend failure aborts the whole run; nothing is stored by
/// this function, so an aborted run leaves no partial state behind.
pub async fn bootstrap_demos(
    signature: &Arc<Signature>,
    backend: &dyn InferenceBackend,
    trainset: &[TrainExample],
    metric: Metric,
    max_demos: usize,
) -> Result<Vec<Demo>> {
    let teacher = Program::new(Arc::clone(signature), Strategy::ReasoningAugmented);
    let mut demos: Vec<Demo> = Vec::new();

    for (index, example) in trainset.iter().enumerate() {
        if demos.len() >= max_demos {
            break;
        }

        let prediction = teacher.execute(backend, &example.inputs).await?;
        let accepted = metric.score(signature, &example.expected, &prediction.outputs);

        tracing::debug!(
            "Bootstrap example {}/{}: {} under {}",
            index + 1,
            trainset.len(),
            if accepted { "accepted" } else { "rejected" },
            metric
        );

        if accepted {
            let mut demo = Demo::new(example.inputs.clone(), example.expected.clone());
            if let Some(reasoning) = prediction.reasoning {
                demo = demo.with_reasoning(reasoning);
            }
            demos.push(demo);
        }
    }

    tracing::info!(
        "Bootstrap for '{}' accepted {}/{} examples (cap {})",
        signature.name,
        demos.len(),
        trainset.len(),
        max_demos
    );

    Ok(demos)
}
