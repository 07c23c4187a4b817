//! Per-call submission context

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Ambient data for one validation call.
///
/// Serializes with the request field names `form`, `_id` and `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionContext {
    /// Form that owns the submission; scopes uniqueness lookups
    #[serde(rename = "form", default)]
    pub form_id: String,

    /// Identifier of the record being updated, exempt from its own
    /// uniqueness check
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<String>,

    /// Full input payload, used for `{{ key }}` substitution in custom rules
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Aborts in-flight store lookups when cancelled
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl SubmissionContext {
    pub fn new(form_id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            form_id: form_id.into(),
            data,
            ..Default::default()
        }
    }

    pub fn with_existing_id(mut self, id: impl Into<String>) -> Self {
        self.existing_id = Some(id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
