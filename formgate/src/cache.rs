//! Compiled validator cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use formgate_fields::FormDefinition;

use crate::error::{Result, ValidatorError};
use crate::validator::{ValidationServices, Validator};

/// Source of form definitions
#[async_trait]
pub trait FormLoader: Send + Sync {
    async fn load_form(&self, form_id: &str) -> Result<FormDefinition>;
}

/// Form loader over an in-memory map of definitions
#[derive(Debug, Default)]
pub struct MemoryFormLoader {
    forms: DashMap<String, FormDefinition>,
    loads: AtomicUsize,
}

impl MemoryFormLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a form, keyed by its id
    pub fn insert(&self, form: FormDefinition) {
        self.forms.insert(form.id.clone(), form);
    }

    /// Number of `load_form` calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormLoader for MemoryFormLoader {
    async fn load_form(&self, form_id: &str) -> Result<FormDefinition> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.forms
            .get(form_id)
            .map(|form| form.value().clone())
            .ok_or_else(|| ValidatorError::form_load(form_id, "form not found"))
    }
}

/// Validators keyed by form id, compiled on first use.
pub struct ValidatorCache {
    loader: Arc<dyn FormLoader>,
    services: ValidationServices,
    validators: DashMap<String, Arc<Validator>>,
}

impl ValidatorCache {
    pub fn new(loader: Arc<dyn FormLoader>, services: ValidationServices) -> Self {
        Self {
            loader,
            services,
            validators: DashMap::new(),
        }
    }

    /// Return the cached validator for a form, loading and compiling it
    /// when absent. Concurrent first calls may both compile; one result wins
    /// and is shared from then on.
    pub async fn get_or_compile(&self, form_id: &str) -> Result<Arc<Validator>> {
        if let Some(validator) = self.validators.get(form_id).map(|v| Arc::clone(v.value())) {
            return Ok(validator);
        }

        let form = self.loader.load_form(form_id).await?;
        let compiled = Arc::new(Validator::compile(&form, self.services.clone()));

        let entry = self
            .validators
            .entry(form_id.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    /// Drop a form's validator so the next call recompiles it.
    /// Returns true when an entry was removed.
    pub fn invalidate(&self, form_id: &str) -> bool {
        let removed = self.validators.remove(form_id).is_some();
        if removed {
            tracing::debug!(form = form_id, "validator invalidated");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
