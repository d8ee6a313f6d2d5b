//! Proxy error types
//!
//! Defines all error types used by the proxy core. Every public operation
//! either returns a well-formed value or exactly one of these variants;
//! stores are never left half-updated on failure.

use std::fmt;
use thiserror::Error;

/// Result type for proxy core operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur during proxy core operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Signature string did not match the `in1, in2 -> out1, out2` notation
    #[error("Invalid signature syntax: {0}")]
    InvalidSignature(String),

    /// A field name appears more than once in a signature
    #[error("Duplicate field name '{field}' in signature '{signature}'")]
    DuplicateField { signature: String, field: String },

    /// Signature not found in the store
    #[error("Signature not found: {0}")]
    SignatureNotFound(String),

    /// Requested prediction strategy is not one of the supported variants
    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    /// No inference backend has been configured yet
    #[error("Inference backend not configured")]
    BackendNotConfigured,

    /// Transport or provider-side failure during a backend invocation
    #[error("Backend invocation failed: {0}")]
    BackendError(String),

    /// Compiled module not found in the store
    #[error("Compiled module not found: {0}")]
    ModuleNotFound(String),

    /// Metric name is not one of the built-in metrics
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Optimizer name is not the supported bootstrap optimizer
    #[error("Unsupported optimizer: {0}")]
    UnsupportedOptimizer(String),

    /// Backend configuration is incomplete or inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProxyError {
    /// Create an invalid signature error
    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    /// Create a duplicate field error
    pub fn duplicate_field(signature: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            signature: signature.into(),
            field: field.into(),
        }
    }

    /// Create a signature not found error
    pub fn signature_not_found(name: impl Into<String>) -> Self {
        Self::SignatureNotFound(name.into())
    }

    /// Create a compiled module not found error
    pub fn module_not_found(id: impl Into<String>) -> Self {
        Self::ModuleNotFound(id.into())
    }

    /// Create a backend invocation error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendError(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// ErrorKind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Signature-related errors (syntax, duplicates, missing)
    Signature,
    /// Compiled module and strategy errors
    Module,
    /// Backend configuration and invocation errors
    Backend,
    /// Metric and optimizer selection errors
    Metric,
    /// Configuration errors
    Config,
}

impl ProxyError {
    /// Get the kind of error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature(_)
            | Self::DuplicateField { .. }
            | Self::SignatureNotFound(_) => ErrorKind::Signature,
            Self::ModuleNotFound(_) | Self::UnsupportedStrategy(_) => ErrorKind::Module,
            Self::BackendNotConfigured | Self::BackendError(_) => ErrorKind::Backend,
            Self::UnknownMetric(_) | Self::UnsupportedOptimizer(_) => ErrorKind::Metric,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Check if this error is recoverable by retrying at the boundary layer
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackendError(_))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Signature => write!(f, "Signature"),
            ErrorKind::Module => write!(f, "Module"),
            ErrorKind::Backend => write!(f, "Backend"),
            ErrorKind::Metric => write!(f, "Metric"),
            ErrorKind::Config => write!(f, "Config"),
        }
    }
}
