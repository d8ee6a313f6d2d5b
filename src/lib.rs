//! # lm-proxy: Stateful proxy core for prompt programs
//!
//! Turns a prompting framework into network-addressable operations:
//! register a typed input/output contract (a *signature*), run a prediction
//! through a chosen strategy, and optimize a strategy by bootstrapping
//! few-shot demonstrations from training examples. The actual language-model
//! call sits behind the [`InferenceBackend`] trait; HTTP routing and request
//! validation belong to whatever boundary layer embeds this crate.
//!
//! ## Components
//!
//! 1. **Signature Store** - named field contracts parsed from
//!    `in1, in2 -> out1, out2` notation
//! 2. **Programs** - direct or reasoning-augmented prediction strategies
//! 3. **Bootstrap Optimizer** - teacher-driven demonstration selection
//! 4. **Compiled Module Store** - optimizer outputs, keyed by generated id
//! 5. **ProxyEngine** - the orchestrator tying the five operations together
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use lm_proxy::{BackendConfig, OptimizeRequest, PredictRequest, ProxyEngine};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> lm_proxy::Result<()> {
//!     let engine = ProxyEngine::new();
//!
//!     // 1. Configure the inference backend
//!     engine.configure(BackendConfig {
//!         provider: "openai".into(),
//!         model: "gpt-4o-mini".into(),
//!         api_key: std::env::var("OPENAI_API_KEY").ok(),
//!         ..Default::default()
//!     }).await?;
//!
//!     // 2. Register a signature
//!     engine.register("qa", "question -> answer", "Answer the question.").await?;
//!
//!     // 3. Optimize it over a training set
//!     let module_id = engine.optimize(OptimizeRequest::new("qa", train_data)).await?;
//!
//!     // 4. Predict with the compiled module
//!     let prediction = engine.predict(
//!         PredictRequest::new("qa", [("question".into(), json!("..."))].into())
//!             .with_compiled_module(&module_id),
//!     ).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod metric;
pub mod optimizer;
pub mod program;
pub mod signature;

// Re-export commonly used types
pub use backend::{BackendConfig, CompletionRequest, DummyBackend, HttpBackend, InferenceBackend};
pub use engine::{EvaluateRequest, Evaluation, OptimizeRequest, PredictRequest, ProxyEngine};
pub use error::{ErrorKind, ProxyError, Result};
pub use metric::Metric;
pub use optimizer::Optimizer;
pub use program::{CompiledModule, Demo, ModuleStore, Prediction, Program, Strategy};
pub use signature::{Field, FieldRole, Signature, SignatureStore};
