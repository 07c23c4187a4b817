//! In-memory submission store

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::query::SubmissionQuery;
use crate::{StoredSubmission, SubmissionStore};

/// Store that keeps submission documents in memory.
///
/// Documents use the persisted layout: `_id`, `form`, `data` and an optional
/// `deleted` marker. Every lookup is counted, and the store can be made to
/// fail or stall to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
    lookups: AtomicUsize,
    failure: Option<StoreError>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given documents
    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Default::default()
        }
    }

    /// Make every lookup fail with this error
    pub fn fail_with(mut self, error: StoreError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Delay every lookup
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a document
    pub async fn insert(&self, document: Value) {
        self.documents.write().await.push(document);
    }

    /// Number of documents held
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Number of `find_one` calls made so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn find_one(&self, query: &SubmissionQuery) -> Result<Option<StoredSubmission>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        query.check()?;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let documents = self.documents.read().await;
        let found = documents
            .iter()
            .find(|document| query.matches(document))
            .cloned()
            .map(StoredSubmission::from_document);

        tracing::trace!(found = found.is_some(), "memory store lookup");
        Ok(found)
    }
}
