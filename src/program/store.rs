//! Compiled Module Store - Write-once registry for optimizer outputs
//!
//! Ids are generated from the source signature name and a process-wide
//! monotonically increasing counter (`"<name>_opt_<count>"`). The counter is
//! an atomic, so concurrent optimize calls never collide even for the same
//! signature. There are no update or delete operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{ProxyError, Result};

use super::CompiledModule;

/// Store for compiled modules, keyed by generated id
#[derive(Debug, Default)]
pub struct ModuleStore {
    modules: RwLock<HashMap<String, Arc<CompiledModule>>>,
    counter: AtomicU64,
}

impl ModuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next module id for a signature name
    ///
    /// The counter is shared across all signatures, matching the original
    /// id scheme where the count reflects total optimize calls.
    pub fn next_id(&self, signature_name: &str) -> String {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_opt_{}", signature_name, count)
    }

    /// Insert a compiled module under its id
    ///
    /// Returns the stored handle. Write-once: callers only insert ids
    /// minted by [`next_id`](Self::next_id), which never repeat.
    pub async fn put(&self, module: CompiledModule) -> Arc<CompiledModule> {
        let id = module.module_id.clone();
        let module = Arc::new(module);

        self.modules
            .write()
            .await
            .insert(id.clone(), Arc::clone(&module));

        tracing::info!(
            "Stored compiled module '{}' with {} demos",
            id,
            module.demo_count()
        );

        module
    }

    /// Fetch a compiled module by id
    ///
    /// # Errors
    ///
    /// Returns `ModuleNotFound` if the id is unknown.
    pub async fn get(&self, id: &str) -> Result<Arc<CompiledModule>> {
        self.modules
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ProxyError::module_not_found(id))
    }

    /// Check if a module id exists
    pub async fn contains(&self, id: &str) -> bool {
        self.modules.read().await.contains_key(id)
    }

    /// List all stored module ids
    pub async fn ids(&self) -> Vec<String> {
        self.modules.read().await.keys().cloned().collect()
    }

    /// Number of stored modules
    pub async fn len(&self) -> usize {
        self.modules.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.modules.read().await.is_empty()
    }
}
