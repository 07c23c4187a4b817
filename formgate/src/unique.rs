//! Uniqueness checks against the submission store.
//!
//! Unique fields are checked one at a time in declaration order; the first
//! failure ends the loop, so later fields never reach the store.

use std::time::Duration;

use formgate_fields::FieldTable;
use formgate_store::{StoredSubmission, SubmissionQuery, SubmissionStore};
use serde_json::{Map, Value};

use crate::context::SubmissionContext;
use crate::error::{Result, ValidatorError};
use crate::verdict::FieldError;

/// Query for a live submission of `form_id` holding `value` at `key`
pub fn unique_query(form_id: &str, key: &str, value: &Value) -> SubmissionQuery {
    SubmissionQuery::new()
        .eq("form", Value::String(form_id.to_string()))
        .eq(format!("data.{key}"), value.clone())
        .missing("deleted")
}

/// Check every unique field and return the first violation.
///
/// Store failures, timeouts and cancellation abort the check with an error.
pub async fn check_unique(
    record: &Map<String, Value>,
    context: &SubmissionContext,
    unique_fields: &FieldTable,
    store: &dyn SubmissionStore,
    timeout: Duration,
) -> Result<Option<FieldError>> {
    for (key, component) in unique_fields.iter() {
        let Some(value) = record.get(key) else {
            if component.is_embedded() {
                continue;
            }
            tracing::debug!(field = key, "unique field has no value");
            return Ok(Some(FieldError::missing_unique(component)));
        };

        let query = unique_query(&context.form_id, key, value);
        let found = lookup(store, &query, key, context, timeout).await?;

        if let Some(existing) = found {
            if is_same_record(&existing, context) {
                continue;
            }
            tracing::debug!(field = key, existing = ?existing.id, "duplicate unique value");
            return Ok(Some(FieldError::not_unique(component)));
        }
    }
    Ok(None)
}

fn is_same_record(existing: &StoredSubmission, context: &SubmissionContext) -> bool {
    match (&existing.id, &context.existing_id) {
        (Some(found), Some(own)) => found == own,
        _ => false,
    }
}

/// One bounded, cancellable store round-trip
async fn lookup(
    store: &dyn SubmissionStore,
    query: &SubmissionQuery,
    key: &str,
    context: &SubmissionContext,
    timeout: Duration,
) -> Result<Option<StoredSubmission>> {
    if context.is_cancelled() {
        return Err(ValidatorError::Cancelled);
    }

    let bounded = tokio::time::timeout(timeout, store.find_one(query));
    let outcome = match &context.cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(field = key, "uniqueness lookup cancelled");
                    return Err(ValidatorError::Cancelled);
                }
                outcome = bounded => outcome,
            }
        }
        None => bounded.await,
    };

    match outcome {
        Ok(Ok(found)) => Ok(found),
        Ok(Err(source)) => Err(ValidatorError::StoreLookup {
            field_key: key.to_string(),
            source,
        }),
        Err(_) => Err(ValidatorError::StoreTimeout {
            field_key: key.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
