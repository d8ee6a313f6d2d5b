//! Prompt rendering and completion parsing
//!
//! The wire protocol between a program and a chat model is line-oriented:
//! each field is rendered as `name: value`, and the model is asked to answer
//! in the same shape. Demos become user/assistant message pairs so the model
//! conditions on them as few-shot exemplars. Parsing walks the completion
//! line by line, collecting the expected output fields; continuation lines
//! append to the most recently seen field.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::program::REASONING_FIELD;

use super::CompletionRequest;

/// A chat message in provider wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: &'static str,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Render a completion request as a chat message sequence
///
/// Layout: one system message (instructions + field protocol), one
/// user/assistant pair per demo, then a final user message with this
/// call's inputs.
pub fn render_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(render_system(request))];

    for demo in &request.demos {
        let inputs = render_fields(&request.input_fields, &demo.inputs);
        if !inputs.is_empty() {
            messages.push(ChatMessage::user(inputs));
        }

        let mut answer = String::new();
        if request.with_reasoning {
            if let Some(reasoning) = &demo.reasoning {
                answer.push_str(&format!("{}: {}\n", REASONING_FIELD, reasoning));
            }
        }
        answer.push_str(&render_fields(&request.output_fields, &demo.outputs));
        if !answer.trim().is_empty() {
            messages.push(ChatMessage::assistant(answer.trim().to_string()));
        }
    }

    messages.push(ChatMessage::user(render_fields(
        &request.input_fields,
        &request.inputs,
    )));

    messages
}

/// Render the system message: instructions plus the field answer protocol
fn render_system(request: &CompletionRequest) -> String {
    let mut expected: Vec<&str> = Vec::new();
    if request.with_reasoning && !request.output_fields.iter().any(|f| f == REASONING_FIELD) {
        expected.push(REASONING_FIELD);
    }
    expected.extend(request.output_fields.iter().map(|s| s.as_str()));

    let protocol = expected
        .iter()
        .map(|name| format!("{}: <{}>", name, name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nRespond with exactly the following fields, one per line:\n{}",
        request.instructions.trim(),
        protocol
    )
}

/// Render named fields as `name: value` lines, declaration order
fn render_fields(field_names: &[String], values: &HashMap<String, Value>) -> String {
    field_names
        .iter()
        .filter_map(|name| values.get(name).map(|v| format!("{}: {}", name, render_value(v))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a JSON value without quoting plain strings
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a completion back into the expected output fields
///
/// Recognizes `name: value` lines for every expected field (outputs plus
/// the rationale field when requested). Lines that do not start a new field
/// are treated as continuations of the previous one.
///
/// # Errors
///
/// Returns `BackendError` if any expected output field is missing from the
/// completion.
pub fn parse_completion(
    text: &str,
    output_fields: &[String],
    with_reasoning: bool,
) -> Result<HashMap<String, Value>> {
    // When a signature declares its own `reasoning` output, the name is
    // already in the expected list and parses as a regular field.
    let mut expected: Vec<String> = Vec::new();
    if with_reasoning && !output_fields.iter().any(|f| f == REASONING_FIELD) {
        expected.push(REASONING_FIELD.to_string());
    }
    expected.extend(output_fields.iter().cloned());

    let mut values: HashMap<String, String> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let mut matched = false;
        for field in &expected {
            if let Some(rest) = line.strip_prefix(&format!("{}:", field)) {
                values.insert(field.clone(), rest.trim().to_string());
                current = Some(field.clone());
                matched = true;
                break;
            }
        }

        if !matched {
            if let Some(field) = &current {
                let entry = values.entry(field.clone()).or_default();
                if !entry.is_empty() {
                    entry.push('\n');
                }
                entry.push_str(line.trim_end());
            }
        }
    }

    for field in output_fields {
        if !values.contains_key(field) {
            return Err(ProxyError::backend(format!(
                "completion missing output field '{}'",
                field
            )));
        }
    }

    Ok(values
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::program::Demo;

    fn request(with_reasoning: bool, demos: Vec<Demo>) -> CompletionRequest {
        CompletionRequest {
            instructions: "Answer the question.".to_string(),
            input_fields: vec!["question".to_string()],
            output_fields: vec!["answer".to_string()],
            demos,
            inputs: [("question".to_string(), json!("What is the capital of France?"))]
                .into_iter()
                .collect(),
            with_reasoning,
        }
    }

    #[test]
    fn test_render_direct_messages() {
        let messages = render_messages(&request(false, Vec::new()));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Answer the question."));
        assert!(messages[0].content.contains("answer: <answer>"));
        assert!(!messages[0].content.contains("reasoning:"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "question: What is the capital of France?"
        );
    }

    #[test]
    fn test_render_reasoning_protocol() {
        let messages = render_messages(&request(true, Vec::new()));
        assert!(messages[0].content.contains("reasoning: <reasoning>"));
    }

    #[test]
    fn test_render_demos_as_message_pairs() {
        let demo = Demo::new(
            [("question".to_string(), json!("What is the capital of Germany?"))]
                .into_iter()
                .collect(),
            [("answer".to_string(), json!("Berlin"))].into_iter().collect(),
        )
        .with_reasoning("Germany's capital is Berlin.");

        let messages = render_messages(&request(true, vec![demo]));

        // system, demo user, demo assistant, final user
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "question: What is the capital of Germany?");
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[2].content.starts_with("reasoning: Germany's capital"));
        assert!(messages[2].content.ends_with("answer: Berlin"));
        assert_eq!(messages[3].role, "user");
    }

    #[test]
    fn test_render_value_strings_unquoted() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!(["a", "b"])), r#"["a","b"]"#);
    }

    #[test]
    fn test_parse_single_field() {
        let outputs =
            parse_completion("answer: Paris", &["answer".to_string()], false).unwrap();
        assert_eq!(outputs["answer"], json!("Paris"));
    }

    #[test]
    fn test_parse_reasoning_and_answer() {
        let text = "reasoning: The capital of France is Paris.\nanswer: Paris";
        let outputs = parse_completion(text, &["answer".to_string()], true).unwrap();

        assert_eq!(outputs["answer"], json!("Paris"));
        assert_eq!(
            outputs[REASONING_FIELD],
            json!("The capital of France is Paris.")
        );
    }

    #[test]
    fn test_parse_continuation_lines() {
        let text = "reasoning: First,\nconsider geography.\nanswer: Paris";
        let outputs = parse_completion(text, &["answer".to_string()], true).unwrap();

        assert_eq!(
            outputs[REASONING_FIELD],
            json!("First,\nconsider geography.")
        );
        assert_eq!(outputs["answer"], json!("Paris"));
    }

    #[test]
    fn test_parse_multiple_output_fields() {
        let text = "summary: short\nanswer: Paris";
        let outputs = parse_completion(
            text,
            &["summary".to_string(), "answer".to_string()],
            false,
        )
        .unwrap();

        assert_eq!(outputs["summary"], json!("short"));
        assert_eq!(outputs["answer"], json!("Paris"));
    }

    #[test]
    fn test_parse_missing_field_fails() {
        let err = parse_completion("reasoning: hm", &["answer".to_string()], true).unwrap_err();
        assert!(matches!(err, ProxyError::BackendError(_)));
        assert!(err.to_string().contains("answer"));
    }

    #[test]
    fn test_declared_reasoning_output_listed_once() {
        let request = CompletionRequest {
            instructions: "Show your work.".to_string(),
            input_fields: vec!["question".to_string()],
            output_fields: vec![REASONING_FIELD.to_string()],
            demos: Vec::new(),
            inputs: [("question".to_string(), json!("how?"))].into_iter().collect(),
            with_reasoning: true,
        };

        let messages = render_messages(&request);
        let protocol_lines = messages[0]
            .content
            .matches("reasoning: <reasoning>")
            .count();
        assert_eq!(protocol_lines, 1);
    }

    #[test]
    fn test_parse_declared_reasoning_output() {
        let outputs = parse_completion(
            "reasoning: step by step",
            &[REASONING_FIELD.to_string()],
            true,
        )
        .unwrap();
        assert_eq!(outputs[REASONING_FIELD], json!("step by step"));
    }

    #[test]
    fn test_parse_missing_reasoning_tolerated() {
        // Rationale is not part of the signature contract, so its absence
        // does not fail the parse.
        let outputs = parse_completion("answer: Paris", &["answer".to_string()], true).unwrap();
        assert_eq!(outputs["answer"], json!("Paris"));
        assert!(!outputs.contains_key(REASONING_FIELD));
    }
}
