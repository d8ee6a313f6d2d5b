//! Parser for the compact signature notation
//!
//! Grammar: `field_list -> field_list`, where a field list is one or more
//! comma-separated identifiers. Exactly one arrow; both sides non-empty;
//! identifiers start with a letter or underscore and continue with
//! alphanumerics or underscores. Field names must be unique across the
//! whole signature, not just within one side.

use std::collections::HashSet;

use crate::error::{ProxyError, Result};

use super::{Field, FieldRole};

/// Parse `in1, in2 -> out1, out2` into an ordered field list
///
/// `signature_name` is only used for error reporting.
pub fn parse_fields(signature_name: &str, spec: &str) -> Result<Vec<Field>> {
    let mut parts = spec.split("->");

    let inputs_part = parts.next().unwrap_or("");
    let outputs_part = parts.next().ok_or_else(|| {
        ProxyError::invalid_signature(format!("missing '->' in '{}'", spec))
    })?;

    if parts.next().is_some() {
        return Err(ProxyError::invalid_signature(format!(
            "more than one '->' in '{}'",
            spec
        )));
    }

    let mut fields = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (part, role) in [(inputs_part, FieldRole::Input), (outputs_part, FieldRole::Output)] {
        let names = parse_field_list(part)?;
        if names.is_empty() {
            return Err(ProxyError::invalid_signature(format!(
                "empty {} field list in '{}'",
                match role {
                    FieldRole::Input => "input",
                    FieldRole::Output => "output",
                },
                spec
            )));
        }

        for name in names {
            if !seen.insert(name.clone()) {
                return Err(ProxyError::duplicate_field(signature_name, name));
            }
            fields.push(Field { name, role });
        }
    }

    Ok(fields)
}

/// Parse one comma-separated side of the arrow
fn parse_field_list(part: &str) -> Result<Vec<String>> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|token| {
            let name = token.trim();
            if name.is_empty() {
                return Err(ProxyError::invalid_signature(format!(
                    "empty field name in '{}'",
                    part.trim()
                )));
            }
            if !is_valid_identifier(name) {
                return Err(ProxyError::invalid_signature(format!(
                    "invalid field name '{}'",
                    name
                )));
            }
            Ok(name.to_string())
        })
        .collect()
}

/// Check that a field name is a valid identifier
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
