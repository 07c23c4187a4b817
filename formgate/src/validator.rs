//! The validator façade

use std::sync::Arc;

use formgate_config::ValidatorConfig;
use formgate_fields::{CompiledForm, FormDefinition, ValidationSchema};
use formgate_js::{SandboxLimits, ScriptSandbox};
use formgate_store::SubmissionStore;
use serde_json::{Map, Value};

use crate::context::SubmissionContext;
use crate::error::Result;
use crate::rules::evaluate_custom_rules;
use crate::unique::check_unique;
use crate::verdict::{FieldError, ValidationVerdict};

/// Sandbox limits derived from configuration
pub fn sandbox_limits(config: &ValidatorConfig) -> SandboxLimits {
    SandboxLimits {
        timeout: config.script_timeout(),
        memory_limit_bytes: config.script_memory_limit_bytes,
        max_stack_bytes: config.script_max_stack_bytes,
        workers: config.script_workers,
    }
}

/// Shared collaborators used by every validator
#[derive(Clone)]
pub struct ValidationServices {
    pub store: Arc<dyn SubmissionStore>,
    pub sandbox: Arc<ScriptSandbox>,
    pub config: ValidatorConfig,
}

impl ValidationServices {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        sandbox: Arc<ScriptSandbox>,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            store,
            sandbox,
            config,
        }
    }

    /// Start a sandbox sized by the configuration
    pub fn from_config(store: Arc<dyn SubmissionStore>, config: ValidatorConfig) -> Result<Self> {
        let sandbox = ScriptSandbox::new(sandbox_limits(&config))?;
        Ok(Self::new(store, Arc::new(sandbox), config))
    }
}

impl std::fmt::Debug for ValidationServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationServices")
            .field("sandbox", self.sandbox.limits())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Validates submissions for one form.
///
/// The compiled schema and side tables are built once in [`Validator::compile`]
/// and never change afterwards, so one validator can serve any number of
/// concurrent `validate` calls.
#[derive(Debug)]
pub struct Validator {
    form_id: String,
    compiled: CompiledForm,
    services: ValidationServices,
}

impl Validator {
    /// Flatten and compile a form
    pub fn compile(form: &FormDefinition, services: ValidationServices) -> Self {
        let compiled = CompiledForm::from_form(form);
        tracing::debug!(form = %form.id, "validator ready");
        Self {
            form_id: form.id.clone(),
            compiled,
            services,
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn compiled(&self) -> &CompiledForm {
        &self.compiled
    }

    pub fn schema(&self) -> &ValidationSchema {
        &self.compiled.schema
    }

    /// Validate one submission.
    ///
    /// Custom rules run first, then uniqueness checks, then the schema. The
    /// first two stages stop at their first failure; schema violations are
    /// reported together. An empty `context.form_id` scopes uniqueness
    /// lookups to this validator's form.
    ///
    /// `Err` is returned only when a store lookup fails, times out, or the
    /// caller cancels.
    pub async fn validate(
        &self,
        submission: &Map<String, Value>,
        context: &SubmissionContext,
    ) -> Result<ValidationVerdict> {
        if let Some(error) = evaluate_custom_rules(
            submission,
            context,
            &self.compiled.custom_rules,
            &self.services.sandbox,
        )
        .await
        {
            return Ok(ValidationVerdict::single(error));
        }

        let scoped;
        let context = if context.form_id.is_empty() {
            scoped = SubmissionContext {
                form_id: self.form_id.clone(),
                ..context.clone()
            };
            &scoped
        } else {
            context
        };

        if let Some(error) = check_unique(
            submission,
            context,
            &self.compiled.unique_fields,
            self.services.store.as_ref(),
            self.services.config.store_timeout(),
        )
        .await?
        {
            return Ok(ValidationVerdict::single(error));
        }

        match self.compiled.schema.apply(submission) {
            Ok(data) => Ok(ValidationVerdict::Valid { data }),
            Err(violations) => Ok(ValidationVerdict::Invalid {
                errors: violations.into_iter().map(FieldError::from).collect(),
            }),
        }
    }
}
