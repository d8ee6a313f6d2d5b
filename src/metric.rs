//! Metrics - Pure scoring of a prediction against a reference example
//!
//! A metric is a pure function of (reference outputs, predicted outputs);
//! no hidden state, so metrics can be swapped without touching the rest of
//! the pipeline. Two built-ins:
//!
//! - `exact_match`: every output field equal under exact, case-sensitive
//!   comparison
//! - `default`: only the last-declared output field compared. A narrow
//!   policy, kept as-is: with one output field it collapses to equality on
//!   that field, which is the common case.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::signature::Signature;

/// Built-in scoring metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// All output fields must match exactly
    ExactMatch,
    /// Only the last-declared output field is compared
    LastField,
}

impl FromStr for Metric {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact_match" => Ok(Self::ExactMatch),
            "default" => Ok(Self::LastField),
            other => Err(ProxyError::UnknownMetric(other.to_string())),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactMatch => write!(f, "exact_match"),
            Self::LastField => write!(f, "default"),
        }
    }
}

impl Metric {
    /// Score predicted outputs against a reference's expected outputs
    ///
    /// Comparison is exact and case-sensitive. A field missing from either
    /// side counts as a mismatch.
    pub fn score(
        &self,
        signature: &Signature,
        expected: &HashMap<String, Value>,
        predicted: &HashMap<String, Value>,
    ) -> bool {
        match self {
            Self::ExactMatch => signature
                .output_names()
                .iter()
                .all(|field| values_equal(expected.get(*field), predicted.get(*field))),
            Self::LastField => {
                let field = signature.last_output();
                values_equal(expected.get(field), predicted.get(field))
            }
        }
    }
}

/// Exact equality; both sides must be present
fn values_equal(expected: Option<&Value>, predicted: Option<&Value>) -> bool {
    match (expected, predicted) {
        (Some(e), Some(p)) => e == p,
        _ => false,
    }
}
