//! Query model for submission lookups.
//!
//! A query is a conjunction of conditions over dotted document paths, the
//! shape a document store's `findOne` accepts.

use serde::Serialize;
use serde_json::Value;

/// One condition of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// The value at `path` equals `value`; an array at `path` matches when
    /// any element equals `value`
    Eq { path: String, value: Value },
    /// Nothing, or `null`, is stored at `path`
    Missing { path: String },
}

impl Condition {
    /// The dotted path this condition reads
    pub fn path(&self) -> &str {
        match self {
            Condition::Eq { path, .. } | Condition::Missing { path } => path,
        }
    }

    /// Evaluate the condition against a document
    pub fn matches(&self, document: &Value) -> bool {
        let found = lookup_path(document, self.path());
        match self {
            Condition::Missing { .. } => found.is_none_or(Value::is_null),
            Condition::Eq { value, .. } => match found {
                Some(found) if found == value => true,
                Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                _ => false,
            },
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionQuery {
    conditions: Vec<Condition>,
}

impl SubmissionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `path` to equal `value`
    pub fn eq(mut self, path: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::Eq {
            path: path.into(),
            value,
        });
        self
    }

    /// Require `path` to be absent or null
    pub fn missing(mut self, path: impl Into<String>) -> Self {
        self.conditions.push(Condition::Missing { path: path.into() });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Reject conditions whose path has an empty segment, such as `data.`
    /// or `a..b`, which no document can hold.
    pub fn check(&self) -> crate::Result<()> {
        match self.conditions.iter().find(|c| {
            c.path()
                .split(formgate_common::KEY_SEPARATOR)
                .any(str::is_empty)
        }) {
            Some(condition) => Err(crate::StoreError::invalid_query(format!(
                "empty segment in path '{}'",
                condition.path()
            ))),
            None => Ok(()),
        }
    }

    /// True when every condition holds for the document
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

/// Resolve a dotted path inside a JSON document
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(formgate_common::KEY_SEPARATOR)
        .try_fold(document, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
