//! Signature Store - Process-wide registry of named signatures
//!
//! Signatures are parsed on registration and stored behind `Arc`, so readers
//! get an immutable snapshot that stays valid even if the name is later
//! re-registered. Re-registering an existing name silently replaces it
//! (last-write-wins) - there is no delete operation, so replacement is the
//! only way to amend a contract.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{ProxyError, Result};

use super::Signature;

/// Process-wide store mapping signature names to parsed signatures
#[derive(Debug, Default)]
pub struct SignatureStore {
    signatures: RwLock<HashMap<String, Arc<Signature>>>,
}

impl SignatureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a signature under `name`
    ///
    /// The signature string is fully validated before the store is touched,
    /// so a failed registration leaves the store unchanged. An existing
    /// entry under the same name is replaced.
    pub async fn register(
        &self,
        name: &str,
        spec: &str,
        instructions: &str,
    ) -> Result<Arc<Signature>> {
        let signature = Arc::new(Signature::parse(name, spec, instructions)?);

        let previous = self
            .signatures
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&signature));

        if previous.is_some() {
            tracing::info!("Replaced signature '{}' (last-write-wins)", name);
        } else {
            tracing::debug!("Registered signature '{}': {}", name, spec);
        }

        Ok(signature)
    }

    /// Look up a signature by name
    ///
    /// # Errors
    ///
    /// Returns `SignatureNotFound` if the name was never registered.
    pub async fn lookup(&self, name: &str) -> Result<Arc<Signature>> {
        self.signatures
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ProxyError::signature_not_found(name))
    }

    /// Check if a signature name is registered
    pub async fn contains(&self, name: &str) -> bool {
        self.signatures.read().await.contains_key(name)
    }

    /// List all registered signature names
    pub async fn names(&self) -> Vec<String> {
        self.signatures.read().await.keys().cloned().collect()
    }

    /// Get the number of registered signatures
    pub async fn len(&self) -> usize {
        self.signatures.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.signatures.read().await.is_empty()
    }
}
