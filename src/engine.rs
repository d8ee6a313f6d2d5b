//! ProxyEngine - Orchestrator for the five core operations
//!
//! Owns the process-wide state (signature store, compiled module store,
//! active backend) and ties each inbound operation to it:
//!
//! ```text
//! configure ──▶ BackendConfig::build ──▶ active backend (atomic replace)
//! register  ──▶ SignatureStore
//! predict   ──▶ SignatureStore + ModuleStore + Program::execute
//! optimize  ──▶ bootstrap_demos ──▶ ModuleStore
//! evaluate  ──▶ ModuleStore + Metric over a test set
//! ```
//!
//! Each operation runs to completion synchronously from its caller's view;
//! the only await point is the backend round trip. The stores hand out
//! `Arc` snapshots, so readers never observe a half-built signature or
//! module.
//!
//! # Example
//!
//! ```rust,ignore
//! use lm_proxy::{BackendConfig, PredictRequest, ProxyEngine};
//! use serde_json::json;
//!
//! let engine = ProxyEngine::new();
//! engine.configure(BackendConfig::dummy(vec![/* canned */])).await?;
//! engine.register("qa", "question -> answer", "").await?;
//!
//! let prediction = engine
//!     .predict(PredictRequest::new("qa", [("question".into(), json!("..."))].into()))
//!     .await?;
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::backend::{BackendConfig, InferenceBackend};
use crate::error::{ProxyError, Result};
use crate::metric::Metric;
use crate::optimizer::{bootstrap_demos, Optimizer, TrainExample, DEFAULT_MAX_DEMOS};
use crate::program::{CompiledModule, ModuleStore, Prediction, Program, Strategy};
use crate::signature::{Signature, SignatureStore};

/// One predict call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Registered signature name
    pub signature_name: String,
    /// Input field values
    pub inputs: HashMap<String, Value>,
    /// Strategy for fresh programs; ignored when a compiled id is given
    #[serde(default)]
    pub strategy: String,
    /// Execute a previously compiled module instead of a fresh program
    #[serde(default)]
    pub compiled_module_id: Option<String>,
}

impl PredictRequest {
    /// Direct prediction against a registered signature
    pub fn new(signature_name: impl Into<String>, inputs: HashMap<String, Value>) -> Self {
        Self {
            signature_name: signature_name.into(),
            inputs,
            strategy: String::new(),
            compiled_module_id: None,
        }
    }

    /// Select a strategy by name
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Execute a compiled module by id
    pub fn with_compiled_module(mut self, id: impl Into<String>) -> Self {
        self.compiled_module_id = Some(id.into());
        self
    }
}

/// One optimize call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    /// Registered signature name
    pub signature_name: String,
    /// Training records: flat field maps, split by the signature's roles
    pub train_data: Vec<HashMap<String, Value>>,
    /// Metric name ("exact_match" or "default")
    #[serde(default = "default_metric_name")]
    pub metric: String,
    /// Optimizer name; only "BootstrapFewShot" is supported
    #[serde(default = "default_optimizer_name")]
    pub optimizer: String,
    /// Demonstration cap
    #[serde(default = "default_max_demos")]
    pub max_demos: usize,
}

fn default_metric_name() -> String {
    "exact_match".to_string()
}

fn default_optimizer_name() -> String {
    "BootstrapFewShot".to_string()
}

fn default_max_demos() -> usize {
    DEFAULT_MAX_DEMOS
}

impl OptimizeRequest {
    /// Optimize a signature over training records with the defaults
    pub fn new(
        signature_name: impl Into<String>,
        train_data: Vec<HashMap<String, Value>>,
    ) -> Self {
        Self {
            signature_name: signature_name.into(),
            train_data,
            metric: default_metric_name(),
            optimizer: default_optimizer_name(),
            max_demos: DEFAULT_MAX_DEMOS,
        }
    }

    /// Select a metric by name
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    /// Select an optimizer by name
    pub fn with_optimizer(mut self, optimizer: impl Into<String>) -> Self {
        self.optimizer = optimizer.into();
        self
    }

    /// Cap the number of demonstrations
    pub fn with_max_demos(mut self, max_demos: usize) -> Self {
        self.max_demos = max_demos;
        self
    }
}

/// One evaluate call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// Compiled module to evaluate
    pub compiled_module_id: String,
    /// Test records, same flat shape as training records
    pub test_data: Vec<HashMap<String, Value>>,
    /// Metric name
    #[serde(default = "default_metric_name")]
    pub metric: String,
}

/// Aggregate evaluation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Fraction of test examples the metric accepted (0.0 for an empty set)
    pub score: f64,
    /// Number of examples scored
    pub total: usize,
    /// Number of examples accepted
    pub passed: usize,
}

/// The stateful proxy core
///
/// Cheap to share behind an `Arc`; all interior state is synchronized.
#[derive(Default)]
pub struct ProxyEngine {
    signatures: SignatureStore,
    modules: ModuleStore,
    backend: RwLock<Option<Arc<dyn InferenceBackend>>>,
}

impl ProxyEngine {
    /// Create an engine with empty stores and no backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure (or reconfigure) the inference backend
    ///
    /// Replaces any prior backend atomically; in-flight executions keep the
    /// backend they started with.
    pub async fn configure(&self, config: BackendConfig) -> Result<()> {
        let backend = config.build()?;
        *self.backend.write().await = Some(backend);
        Ok(())
    }

    /// Install a pre-built backend directly
    ///
    /// Bypasses [`BackendConfig`]; the seam tests and embedders use to
    /// inject custom collaborators.
    pub async fn set_backend(&self, backend: Arc<dyn InferenceBackend>) {
        *self.backend.write().await = Some(backend);
    }

    /// Register a signature from the compact notation
    pub async fn register(
        &self,
        name: &str,
        spec: &str,
        instructions: &str,
    ) -> Result<Arc<Signature>> {
        self.signatures.register(name, spec, instructions).await
    }

    /// Look up a registered signature
    pub async fn signature(&self, name: &str) -> Result<Arc<Signature>> {
        self.signatures.lookup(name).await
    }

    /// Fetch a compiled module by id
    pub async fn compiled_module(&self, id: &str) -> Result<Arc<CompiledModule>> {
        self.modules.get(id).await
    }

    /// Run one prediction
    ///
    /// With a `compiled_module_id`, the module's own signature snapshot and
    /// demonstrations are used; otherwise a fresh program of the requested
    /// strategy is built against the registered signature. Either way the
    /// signature name must resolve first, so a stale request fails with
    /// `SignatureNotFound` before any backend work.
    pub async fn predict(&self, request: PredictRequest) -> Result<Prediction> {
        let signature = self.signatures.lookup(&request.signature_name).await?;
        let backend = self.active_backend().await?;

        let program = match &request.compiled_module_id {
            Some(id) => self.modules.get(id).await?.program(),
            None => {
                let strategy = if request.strategy.is_empty() {
                    Strategy::Direct
                } else {
                    Strategy::from_str(&request.strategy)?
                };
                Program::new(signature, strategy)
            }
        };

        program.execute(backend.as_ref(), &request.inputs).await
    }

    /// Optimize a signature into a compiled module; returns the module id
    ///
    /// Nothing is inserted into the module store until the whole bootstrap
    /// run has succeeded, so a backend failure mid-run leaves no trace.
    pub async fn optimize(&self, request: OptimizeRequest) -> Result<String> {
        let Optimizer::BootstrapFewShot = Optimizer::from_str(&request.optimizer)?;
        let metric = Metric::from_str(&request.metric)?;
        let signature = self.signatures.lookup(&request.signature_name).await?;
        let backend = self.active_backend().await?;

        let trainset: Vec<TrainExample> = request
            .train_data
            .iter()
            .map(|record| TrainExample::from_record(&signature, record))
            .collect();

        let demos = bootstrap_demos(
            &signature,
            backend.as_ref(),
            &trainset,
            metric,
            request.max_demos,
        )
        .await?;

        let module = CompiledModule {
            module_id: self.modules.next_id(&signature.name),
            signature,
            strategy: Strategy::ReasoningAugmented,
            demos,
        };
        let stored = self.modules.put(module).await;

        Ok(stored.module_id.clone())
    }

    /// Evaluate a compiled module over a test set
    ///
    /// Runs sequentially, one prediction per example, and returns the
    /// fraction the metric accepted.
    pub async fn evaluate(&self, request: EvaluateRequest) -> Result<Evaluation> {
        let metric = Metric::from_str(&request.metric)?;
        let module = self.modules.get(&request.compiled_module_id).await?;
        let backend = self.active_backend().await?;

        let program = module.program();
        let mut passed = 0;

        for record in &request.test_data {
            let example = TrainExample::from_record(&module.signature, record);
            let prediction = program.execute(backend.as_ref(), &example.inputs).await?;
            if metric.score(&module.signature, &example.expected, &prediction.outputs) {
                passed += 1;
            }
        }

        let total = request.test_data.len();
        let score = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        };

        tracing::info!(
            "Evaluated '{}': {}/{} passed under {}",
            request.compiled_module_id,
            passed,
            total,
            metric
        );

        Ok(Evaluation {
            score,
            total,
            passed,
        })
    }

    async fn active_backend(&self) -> Result<Arc<dyn InferenceBackend>> {
        self.backend
            .read()
            .await
            .clone()
            .ok_or(ProxyError::BackendNotConfigured)
    }
}

impl std::fmt::Debug for ProxyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::backend::DummyBackend;

    fn inputs(question: &str) -> HashMap<String, Value> {
        [("question".to_string(), json!(question))].into_iter().collect()
    }

    #[tokio::test]
    async fn test_predict_requires_backend() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();

        let err = engine
            .predict(PredictRequest::new("qa", inputs("q")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::BackendNotConfigured));
    }

    #[tokio::test]
    async fn test_predict_unknown_signature() {
        let engine = ProxyEngine::new();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let err = engine
            .predict(PredictRequest::new("missing", inputs("q")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::SignatureNotFound(_)));
    }

    #[tokio::test]
    async fn test_predict_unknown_strategy() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let err = engine
            .predict(PredictRequest::new("qa", inputs("q")).with_strategy("ReAct"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedStrategy(_)));
    }

    #[tokio::test]
    async fn test_reconfigure_replaces_backend() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();

        engine
            .configure(BackendConfig::dummy(vec![
                [("answer".to_string(), json!("first"))].into_iter().collect(),
            ]))
            .await
            .unwrap();
        let p = engine
            .predict(PredictRequest::new("qa", inputs("q")))
            .await
            .unwrap();
        assert_eq!(p.outputs["answer"], json!("first"));

        engine
            .configure(BackendConfig::dummy(vec![
                [("answer".to_string(), json!("second"))].into_iter().collect(),
            ]))
            .await
            .unwrap();
        let p = engine
            .predict(PredictRequest::new("qa", inputs("q")))
            .await
            .unwrap();
        assert_eq!(p.outputs["answer"], json!("second"));
    }

    #[tokio::test]
    async fn test_optimize_unknown_optimizer_leaves_store_empty() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let err = engine
            .optimize(OptimizeRequest::new("qa", Vec::new()).with_optimizer("MIPROv2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedOptimizer(_)));
    }

    #[tokio::test]
    async fn test_optimize_unknown_metric() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let err = engine
            .optimize(OptimizeRequest::new("qa", Vec::new()).with_metric("f1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UnknownMetric(_)));
    }

    #[tokio::test]
    async fn test_evaluate_unknown_module() {
        let engine = ProxyEngine::new();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let err = engine
            .evaluate(EvaluateRequest {
                compiled_module_id: "qa_opt_0".to_string(),
                test_data: Vec::new(),
                metric: "exact_match".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::ModuleNotFound(_)));
    }

    #[tokio::test]
    async fn test_evaluate_empty_test_set() {
        let engine = ProxyEngine::new();
        engine.register("qa", "question -> answer", "").await.unwrap();
        engine
            .set_backend(Arc::new(DummyBackend::new(Vec::new())))
            .await;

        let id = engine
            .optimize(OptimizeRequest::new("qa", Vec::new()))
            .await
            .unwrap();
        let evaluation = engine
            .evaluate(EvaluateRequest {
                compiled_module_id: id,
                test_data: Vec::new(),
                metric: "exact_match".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(evaluation.total, 0);
        assert_eq!(evaluation.score, 0.0);
    }

    #[test]
    fn test_predict_request_deserializes_minimal() {
        let request: PredictRequest = serde_json::from_str(
            r#"{"signature_name": "qa", "inputs": {"question": "q"}}"#,
        )
        .unwrap();
        assert!(request.strategy.is_empty());
        assert!(request.compiled_module_id.is_none());
    }

    #[test]
    fn test_optimize_request_defaults() {
        let request: OptimizeRequest =
            serde_json::from_str(r#"{"signature_name": "qa", "train_data": []}"#).unwrap();
        assert_eq!(request.metric, "exact_match");
        assert_eq!(request.optimizer, "BootstrapFewShot");
        assert_eq!(request.max_demos, 4);
    }
}
