//! Validation verdicts and field-level errors

use formgate_fields::{FieldComponent, SchemaViolation};
use serde::Serialize;
use serde_json::{Map, Value};

/// Error kind reported for a missing unique value
pub const KIND_UNIQUE_REQUIRED: &str = "unique.required";
/// Error kind reported for a duplicate unique value
pub const KIND_UNIQUE: &str = "unique";

/// Which stage rejected a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// A custom rule returned something other than `true`, or failed to run
    CustomValidation,
    /// Another live record already holds this unique value
    UniquenessViolation,
    /// A top-level unique field had no value at all
    MissingRequiredUnique,
    /// The compiled schema rejected the value
    Schema,
}

/// One field-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_key: String,
    pub message: String,
    /// Machine-readable kind, e.g. `textfield.custom` or `string.min`
    pub kind: String,
    pub category: FailureCategory,
}

impl FieldError {
    pub(crate) fn custom(component: &FieldComponent, message: impl Into<String>) -> Self {
        Self {
            field_key: component.key.clone(),
            message: message.into(),
            kind: format!("{}.custom", component.type_),
            category: FailureCategory::CustomValidation,
        }
    }

    pub(crate) fn not_unique(component: &FieldComponent) -> Self {
        Self {
            field_key: component.key.clone(),
            message: format!("{} must be unique.", component.display_name()),
            kind: KIND_UNIQUE.to_string(),
            category: FailureCategory::UniquenessViolation,
        }
    }

    pub(crate) fn missing_unique(component: &FieldComponent) -> Self {
        Self {
            field_key: component.key.clone(),
            message: "Unique fields cannot be empty.".to_string(),
            kind: KIND_UNIQUE_REQUIRED.to_string(),
            category: FailureCategory::MissingRequiredUnique,
        }
    }
}

impl From<SchemaViolation> for FieldError {
    fn from(violation: SchemaViolation) -> Self {
        Self {
            field_key: violation.path,
            message: violation.message,
            kind: violation.kind,
            category: FailureCategory::Schema,
        }
    }
}

/// Outcome of validating one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// The sanitized record
    Valid { data: Map<String, Value> },
    /// One error from a short-circuiting stage, or every schema violation
    Invalid { errors: Vec<FieldError> },
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationVerdict::Valid { .. })
    }

    /// The sanitized record, if valid
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            ValidationVerdict::Valid { data } => Some(data),
            ValidationVerdict::Invalid { .. } => None,
        }
    }

    /// The reported errors; empty when valid
    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationVerdict::Valid { .. } => &[],
            ValidationVerdict::Invalid { errors } => errors,
        }
    }

    pub(crate) fn single(error: FieldError) -> Self {
        ValidationVerdict::Invalid {
            errors: vec![error],
        }
    }
}
