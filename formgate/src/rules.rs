//! Custom rule evaluation.
//!
//! Each rule is author-supplied JavaScript that sees exactly three globals:
//! `input` (the submitted value), `component` (the field definition) and
//! `valid` (seeded `true`). Whatever the script leaves in `valid` is the
//! verdict: `true` passes, a string is the error message, anything else
//! fails with a generic message.

use std::borrow::Cow;

use formgate_fields::{FieldComponent, FieldTable};
use formgate_js::{ScriptRequest, ScriptSandbox};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::context::SubmissionContext;
use crate::verdict::FieldError;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s+(.*)\s+\}\}").expect("Invalid placeholder regex"));

/// Replace the first `{{ key }}` placeholder with the payload value at `key`.
///
/// Rules quote string placeholders themselves (`'{{ key }}'`), so strings are
/// inserted escaped for a JS string literal and cannot close the quotes they
/// sit in. Other values go in as JSON text and a missing key as `undefined`.
/// Later placeholders are left untouched.
pub fn substitute_placeholder<'a>(source: &'a str, payload: &Map<String, Value>) -> Cow<'a, str> {
    PLACEHOLDER_REGEX.replacen(source, 1, |caps: &Captures| match payload.get(&caps[1]) {
        Some(Value::String(text)) => escape_string_literal(text),
        Some(value) => value.to_string(),
        None => "undefined".to_string(),
    })
}

/// Escape text for use inside a single, double or backtick quoted JS string.
fn escape_string_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '`' => escaped.push_str("\\`"),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Build the sandbox request for one rule. `component` is the node as
/// authored, unmodelled attributes included.
fn rule_request(source: String, input: &Value, component: &FieldComponent) -> ScriptRequest {
    let component_value = serde_json::to_value(component).unwrap_or_default();
    ScriptRequest::new(source)
        .bind("input", input.clone())
        .bind("component", component_value)
        .bind("valid", Value::Bool(true))
        .read_back("valid")
}

/// Run custom rules in table order and return the first failure.
///
/// Only fields present in the record are evaluated. Script errors, including
/// running out of time, count as failures carrying the error text.
pub async fn evaluate_custom_rules(
    record: &Map<String, Value>,
    context: &SubmissionContext,
    rules: &FieldTable,
    sandbox: &ScriptSandbox,
) -> Option<FieldError> {
    for (key, component) in rules.iter() {
        let Some(input) = record.get(key) else {
            continue;
        };
        let Some(source) = component.custom_rule() else {
            continue;
        };

        let source = substitute_placeholder(source, &context.data).into_owned();
        let outcome = sandbox
            .evaluate(rule_request(source, input, component))
            .await;

        let message = match outcome {
            Ok(Value::Bool(true)) => continue,
            Ok(Value::String(message)) => message,
            Ok(_) => format!("{} failed custom validation", component.display_name()),
            Err(e) => {
                tracing::warn!(field = key, "custom rule raised an error: {e}");
                e.to_string()
            }
        };

        tracing::debug!(field = key, "custom rule rejected value");
        return Some(FieldError::custom(component, message));
    }
    None
}
