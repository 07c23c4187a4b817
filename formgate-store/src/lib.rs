//! Submission store interface for Formgate.
//!
//! The validator only needs a `findOne`-style lookup: given a conjunction of
//! conditions over dotted paths, return the first matching stored submission.
//! [`MemoryStore`] implements it over JSON documents for tests and the CLI.

pub mod error;
pub mod memory;
pub mod query;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use query::{lookup_path, Condition, SubmissionQuery};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A stored submission returned by a lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSubmission {
    /// The record identifier (`_id`), when the document has one
    pub id: Option<String>,
    pub document: Value,
}

impl StoredSubmission {
    /// Wrap a raw document, reading its `_id`
    pub fn from_document(document: Value) -> Self {
        let id = match document.get("_id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self { id, document }
    }
}

/// Read access to persisted submissions
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Return the first submission matching every condition of the query
    async fn find_one(&self, query: &SubmissionQuery) -> Result<Option<StoredSubmission>>;
}
