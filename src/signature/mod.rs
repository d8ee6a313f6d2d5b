//! Signatures - Named input/output field contracts
//!
//! A signature is the typed contract a prompt program is bound to: an ordered
//! list of named fields, each tagged input or output, plus free-text
//! instructions describing the task. Signatures are built at runtime from the
//! compact `in1, in2 -> out1, out2` notation and are immutable once stored.
//!
//! # Example
//!
//! ```rust,ignore
//! use lm_proxy::signature::Signature;
//!
//! let sig = Signature::parse("qa", "question -> answer", "")?;
//! assert_eq!(sig.input_names(), vec!["question"]);
//! assert_eq!(sig.output_names(), vec!["answer"]);
//! ```

pub mod parser;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use store::SignatureStore;

/// Role of a field within a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Field is supplied by the caller
    Input,
    /// Field is produced by the program
    Output,
}

/// A single named field in a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name (e.g., "question", "answer")
    pub name: String,
    /// Whether the field is an input or an output
    pub role: FieldRole,
}

impl Field {
    /// Create an input field
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Input,
        }
    }

    /// Create an output field
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Output,
        }
    }
}

/// A named input/output field contract
///
/// Field order is declaration order from the compact notation and is
/// preserved everywhere it matters: prompt rendering, output parsing, and
/// the default metric's last-output-field tie-break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Name the signature was registered under
    pub name: String,
    /// Ordered fields, inputs and outputs interleaved as declared
    pub fields: Vec<Field>,
    /// Free-text task instructions
    pub instructions: String,
}

impl Signature {
    /// Parse a signature from the compact `in1, in2 -> out1, out2` notation
    ///
    /// If `instructions` is empty, a default instruction is synthesized from
    /// the field names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` if the arrow or field lists are malformed,
    /// or `DuplicateField` if a field name repeats anywhere in the notation.
    pub fn parse(name: &str, spec: &str, instructions: &str) -> Result<Self> {
        let fields = parser::parse_fields(name, spec)?;

        let instructions = if instructions.trim().is_empty() {
            default_instructions(&fields)
        } else {
            instructions.to_string()
        };

        Ok(Self {
            name: name.to_string(),
            fields,
            instructions,
        })
    }

    /// Names of the input fields, in declaration order
    pub fn input_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Input)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of the output fields, in declaration order
    pub fn output_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Output)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// The last-declared output field
    ///
    /// Used by the default metric, which compares only this field.
    pub fn last_output(&self) -> &str {
        self.fields
            .iter()
            .rev()
            .find(|f| f.role == FieldRole::Output)
            .map(|f| f.name.as_str())
            // parse() guarantees at least one output field
            .unwrap_or_default()
    }

    /// Total number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the signature has no fields (never true for parsed signatures)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Synthesize a default instruction from the field names
fn default_instructions(fields: &[Field]) -> String {
    let inputs: Vec<String> = fields
        .iter()
        .filter(|f| f.role == FieldRole::Input)
        .map(|f| format!("`{}`", f.name))
        .collect();
    let outputs: Vec<String> = fields
        .iter()
        .filter(|f| f.role == FieldRole::Output)
        .map(|f| format!("`{}`", f.name))
        .collect();

    format!(
        "Given the fields {}, produce the fields {}.",
        inputs.join(", "),
        outputs.join(", ")
    )
}
