//! Compiled validation schema.
//!
//! A [`ValidationSchema`] maps field keys to a [`FieldConstraint`] and is
//! applied as the final gate of validation: it checks types, lengths,
//! ranges, patterns and required-ness, coerces numeric strings, drops empty
//! values and strips keys it does not know.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::types::{FieldComponent, FieldType, ValidateBundle};

/// Key of the implicit record identifier
pub const ID_KEY: &str = "_id";

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

/// How a number's fractional part is restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRule {
    Integer,
    /// At most this many digits after the decimal point
    Precision(usize),
}

/// Type-specific part of a constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BaseConstraint {
    /// Non-empty string identifier
    Identity,
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Email,
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<StepRule>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        greater: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        less: Option<f64>,
    },
    Any,
}

/// A compiled regular expression that compares and serializes by source.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern, returning `None` when it is not a valid regex
    pub fn new(source: &str) -> Option<Self> {
        match Regex::new(source) {
            Ok(regex) => Some(Self {
                source: source.to_string(),
                regex,
            }),
            Err(e) => {
                tracing::warn!(pattern = source, "skipping invalid pattern: {e}");
                None
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Everything checked for one field key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConstraint {
    pub label: String,
    #[serde(flatten)]
    pub base: BaseConstraint,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    /// Value is a sparse array of the base constraint
    pub multiple: bool,
}

impl FieldConstraint {
    /// Build the constraint for a keyed leaf component.
    ///
    /// Sub-constraints with unusable data are skipped; this never fails.
    pub fn for_component(component: &FieldComponent) -> Self {
        let validate = component.validate.as_ref();
        let base = base_constraint(&component.type_, validate);

        let mut required = false;
        let mut pattern = None;
        // Only top-level persistent fields get required/pattern
        if component.persistent && !component.is_embedded() {
            if let Some(validate) = validate {
                required = validate.required;
                if matches!(base, BaseConstraint::Text { .. } | BaseConstraint::Email) {
                    pattern = validate.pattern().and_then(Pattern::new);
                }
            }
        }

        Self {
            label: component.display_name().to_string(),
            base,
            required,
            pattern,
            multiple: component.multiple,
        }
    }

    fn identity() -> Self {
        Self {
            label: ID_KEY.to_string(),
            base: BaseConstraint::Identity,
            required: false,
            pattern: None,
            multiple: false,
        }
    }

    /// Check one field's raw value. `Ok(None)` means the field is dropped
    /// from the sanitized record.
    fn check(
        &self,
        key: &str,
        raw: Option<&Value>,
    ) -> Result<Option<Value>, Vec<SchemaViolation>> {
        let Some(raw) = raw else {
            return if self.required {
                Err(vec![SchemaViolation::new(
                    key,
                    "any.required",
                    format!("\"{}\" is required", self.label),
                )])
            } else {
                Ok(None)
            };
        };

        if self.multiple {
            return self.check_array(key, raw);
        }

        match self.check_scalar(key, raw).map_err(|v| vec![v])? {
            Some(value) => Ok(Some(value)),
            None if self.required => Err(vec![self.empty_violation(key, raw)]),
            None => Ok(None),
        }
    }

    fn check_array(&self, key: &str, raw: &Value) -> Result<Option<Value>, Vec<SchemaViolation>> {
        let Value::Array(items) = raw else {
            return Err(vec![SchemaViolation::new(
                key,
                "array.base",
                format!("\"{}\" must be an array", self.label),
            )]);
        };

        let mut violations = Vec::new();
        let mut sanitized = Vec::with_capacity(items.len());
        let mut present = 0usize;
        for (index, item) in items.iter().enumerate() {
            if item.is_null() {
                sanitized.push(Value::Null);
                continue;
            }
            let path = format!("{}[{}]", key, index);
            match self.check_scalar(&path, item) {
                Ok(Some(value)) => {
                    present += 1;
                    sanitized.push(value);
                }
                Ok(None) => sanitized.push(Value::Null),
                Err(violation) => violations.push(violation),
            }
        }

        if self.required && present == 0 && violations.is_empty() {
            violations.push(SchemaViolation::new(
                key,
                "array.includesRequiredUnknowns",
                format!("\"{}\" does not contain 1 required value(s)", self.label),
            ));
        }

        if violations.is_empty() {
            Ok(Some(Value::Array(sanitized)))
        } else {
            Err(violations)
        }
    }

    /// Check a single value. `Ok(None)` means the value counts as empty.
    fn check_scalar(&self, path: &str, value: &Value) -> Result<Option<Value>, SchemaViolation> {
        let label = &self.label;
        match &self.base {
            BaseConstraint::Any => Ok(Some(value.clone())),
            BaseConstraint::Identity => match value {
                Value::String(s) if !s.is_empty() => Ok(Some(value.clone())),
                Value::String(_) => Err(SchemaViolation::new(
                    path,
                    "any.empty",
                    format!("\"{label}\" is not allowed to be empty"),
                )),
                _ => Err(SchemaViolation::new(
                    path,
                    "string.base",
                    format!("\"{label}\" must be a string"),
                )),
            },
            BaseConstraint::Text {
                min_length,
                max_length,
            } => {
                let Some(text) = non_empty_string(path, label, value)? else {
                    return Ok(None);
                };
                let length = text.chars().count();
                if let Some(min) = min_length.filter(|min| length < *min) {
                    return Err(SchemaViolation::new(
                        path,
                        "string.min",
                        format!("\"{label}\" length must be at least {min} characters long"),
                    ));
                }
                if let Some(max) = max_length.filter(|max| length > *max) {
                    return Err(SchemaViolation::new(
                        path,
                        "string.max",
                        format!(
                            "\"{label}\" length must be less than or equal to {max} characters long"
                        ),
                    ));
                }
                self.check_pattern(path, text)?;
                Ok(Some(value.clone()))
            }
            BaseConstraint::Email => {
                let Some(text) = non_empty_string(path, label, value)? else {
                    return Ok(None);
                };
                if !EMAIL_REGEX.is_match(text) {
                    return Err(SchemaViolation::new(
                        path,
                        "string.email",
                        format!("\"{label}\" must be a valid email"),
                    ));
                }
                self.check_pattern(path, text)?;
                Ok(Some(value.clone()))
            }
            BaseConstraint::Number {
                step,
                min,
                max,
                greater,
                less,
            } => {
                if value.is_null() {
                    return Ok(None);
                }
                let Some(number) = coerce_number(value) else {
                    return Err(SchemaViolation::new(
                        path,
                        "number.base",
                        format!("\"{label}\" must be a number"),
                    ));
                };
                match step {
                    Some(StepRule::Integer) if number.fract() != 0.0 => {
                        return Err(SchemaViolation::new(
                            path,
                            "number.integer",
                            format!("\"{label}\" must be an integer"),
                        ));
                    }
                    Some(StepRule::Precision(limit)) if decimal_places(number) > *limit => {
                        return Err(SchemaViolation::new(
                            path,
                            "number.precision",
                            format!("\"{label}\" must have no more than {limit} decimal places"),
                        ));
                    }
                    _ => {}
                }
                let bounds = [
                    (*min, "number.min", "greater than or equal to", number < min.unwrap_or(f64::NEG_INFINITY)),
                    (*max, "number.max", "less than or equal to", number > max.unwrap_or(f64::INFINITY)),
                    (*greater, "number.greater", "greater than", number <= greater.unwrap_or(f64::NEG_INFINITY)),
                    (*less, "number.less", "less than", number >= less.unwrap_or(f64::INFINITY)),
                ];
                for (bound, kind, phrase, violated) in bounds {
                    if let (Some(bound), true) = (bound, violated) {
                        return Err(SchemaViolation::new(
                            path,
                            kind,
                            format!("\"{label}\" must be {phrase} {bound}"),
                        ));
                    }
                }
                Ok(Some(number_value(value, number)))
            }
        }
    }

    fn check_pattern(&self, path: &str, text: &str) -> Result<(), SchemaViolation> {
        match &self.pattern {
            Some(pattern) if !pattern.is_match(text) => Err(SchemaViolation::new(
                path,
                "string.regex.base",
                format!(
                    "\"{}\" with value \"{}\" fails to match the required pattern: /{}/",
                    self.label,
                    text,
                    pattern.source()
                ),
            )),
            _ => Ok(()),
        }
    }

    fn empty_violation(&self, key: &str, raw: &Value) -> SchemaViolation {
        if raw.is_null() && matches!(self.base, BaseConstraint::Number { .. }) {
            SchemaViolation::new(
                key,
                "number.base",
                format!("\"{}\" must be a number", self.label),
            )
        } else {
            SchemaViolation::new(
                key,
                "any.empty",
                format!("\"{}\" is not allowed to be empty", self.label),
            )
        }
    }

    /// Short human-readable rule list, used by [`ValidationSchema::describe`]
    fn rules(&self) -> Vec<String> {
        let mut rules = Vec::new();
        if self.required {
            rules.push("required".to_string());
        }
        match &self.base {
            BaseConstraint::Text {
                min_length,
                max_length,
            } => {
                if let Some(min) = min_length {
                    rules.push(format!("min length {min}"));
                }
                if let Some(max) = max_length {
                    rules.push(format!("max length {max}"));
                }
            }
            BaseConstraint::Email => rules.push("email".to_string()),
            BaseConstraint::Number {
                step,
                min,
                max,
                greater,
                less,
            } => {
                match step {
                    Some(StepRule::Integer) => rules.push("integer".to_string()),
                    Some(StepRule::Precision(p)) => rules.push(format!("precision {p}")),
                    None => {}
                }
                let bounds = [(min, ">="), (max, "<="), (greater, ">"), (less, "<")];
                for (bound, op) in bounds {
                    if let Some(bound) = bound {
                        rules.push(format!("{op} {bound}"));
                    }
                }
            }
            BaseConstraint::Identity | BaseConstraint::Any => {}
        }
        if let Some(pattern) = &self.pattern {
            rules.push(format!("pattern /{}/", pattern.source()));
        }
        if self.multiple {
            rules.push("array".to_string());
        }
        rules
    }
}

fn non_empty_string<'a>(
    path: &str,
    label: &str,
    value: &'a Value,
) -> Result<Option<&'a str>, SchemaViolation> {
    match value {
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        _ => Err(SchemaViolation::new(
            path,
            "string.base",
            format!("\"{label}\" must be a string"),
        )),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Keep JSON numbers as given; turn coerced strings into numbers.
fn number_value(original: &Value, number: f64) -> Value {
    if original.is_number() {
        return original.clone();
    }
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

fn decimal_places(number: f64) -> usize {
    let text = number.to_string();
    text.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn length_bound(value: Option<&Value>) -> Option<usize> {
    let number = numeric(value)?;
    (number >= 0.0 && number.fract() == 0.0).then_some(number as usize)
}

fn step_rule(step: Option<&Value>) -> Option<StepRule> {
    let text = match step? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.as_f64()?.to_string(),
        _ => return None,
    };
    if text.is_empty() || text == "any" || text.parse::<f64>().is_err() {
        return None;
    }
    match text.split_once('.') {
        Some((_, fraction)) => Some(StepRule::Precision(fraction.len())),
        None => Some(StepRule::Integer),
    }
}

fn base_constraint(type_: &FieldType, validate: Option<&ValidateBundle>) -> BaseConstraint {
    match type_ {
        t if t.is_text_like() => BaseConstraint::Text {
            min_length: length_bound(validate.and_then(|v| v.min_length.as_ref())),
            max_length: length_bound(validate.and_then(|v| v.max_length.as_ref())),
        },
        FieldType::Email => BaseConstraint::Email,
        FieldType::Number => BaseConstraint::Number {
            step: step_rule(validate.and_then(|v| v.step.as_ref())),
            min: numeric(validate.and_then(|v| v.min.as_ref())),
            max: numeric(validate.and_then(|v| v.max.as_ref())),
            greater: numeric(validate.and_then(|v| v.greater.as_ref())),
            less: numeric(validate.and_then(|v| v.less.as_ref())),
        },
        _ => BaseConstraint::Any,
    }
}

/// One failed schema check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Field key, with `[index]` for array entries
    pub path: String,
    /// Machine-readable rule name such as `string.min`
    pub kind: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, kind: &str, message: String) -> Self {
        Self {
            path: path.into(),
            kind: kind.to_string(),
            message,
        }
    }
}

/// Summary of one schema entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub rules: Vec<String>,
}

/// Immutable mapping from field key to constraint.
///
/// Always contains the identifier key `_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSchema {
    fields: IndexMap<String, FieldConstraint>,
}

impl Default for ValidationSchema {
    fn default() -> Self {
        let mut fields = IndexMap::new();
        fields.insert(ID_KEY.to_string(), FieldConstraint::identity());
        Self { fields }
    }
}

impl ValidationSchema {
    /// Add or replace the constraint for a key
    pub(crate) fn insert(&mut self, key: String, constraint: FieldConstraint) {
        self.fields.insert(key, constraint);
    }

    /// Keys in declaration order, starting with `_id`
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&FieldConstraint> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a record and return a sanitized copy.
    ///
    /// Every field is checked and all violations are returned together.
    /// Keys not in the schema are stripped rather than reported.
    pub fn apply(&self, record: &Map<String, Value>) -> Result<Map<String, Value>, Vec<SchemaViolation>> {
        let mut sanitized = Map::new();
        let mut violations = Vec::new();

        for (key, constraint) in &self.fields {
            match constraint.check(key, record.get(key)) {
                Ok(Some(value)) => {
                    sanitized.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(mut errors) => violations.append(&mut errors),
            }
        }

        if violations.is_empty() {
            Ok(sanitized)
        } else {
            tracing::debug!(count = violations.len(), "schema rejected record");
            Err(violations)
        }
    }

    /// Serializable summary of every entry
    pub fn describe(&self) -> Vec<FieldSummary> {
        self.fields
            .iter()
            .map(|(key, constraint)| FieldSummary {
                key: key.clone(),
                label: constraint.label.clone(),
                type_: match constraint.base {
                    BaseConstraint::Identity => "id",
                    BaseConstraint::Text { .. } => "string",
                    BaseConstraint::Email => "email",
                    BaseConstraint::Number { .. } => "number",
                    BaseConstraint::Any => "any",
                },
                rules: constraint.rules(),
            })
            .collect()
    }
}
