//! # Formgate
//!
//! Validates form submissions against forms defined at runtime.
//!
//! A [`Validator`] is compiled once per form. Each call to
//! [`Validator::validate`] then runs three stages in a fixed order:
//!
//! 1. **Custom rules** - author-supplied JavaScript, evaluated in a sandbox
//!    with only `input`, `component` and `valid` bound. The first rule that
//!    does not leave `valid === true` ends validation.
//! 2. **Uniqueness** - one store lookup per unique field, strictly in
//!    declaration order, each bounded by a timeout and the caller's
//!    cancellation token. The first conflict ends validation.
//! 3. **Schema** - type, length, range, pattern and required checks. All
//!    violations are reported together; unknown keys are stripped from the
//!    sanitized record.
//!
//! ```no_run
//! use std::sync::Arc;
//! use formgate::{SubmissionContext, ValidationServices, Validator};
//! use formgate_config::ValidatorConfig;
//! use formgate_fields::FormDefinition;
//! use formgate_store::MemoryStore;
//! use serde_json::json;
//!
//! # async fn example() -> formgate::Result<()> {
//! let form = FormDefinition::from_value(json!({
//!     "_id": "signup",
//!     "components": [
//!         {"key": "age", "type": "number", "validate": {"custom": "valid = input >= 18 || 'Too young';"}}
//!     ]
//! })).unwrap();
//!
//! let services = ValidationServices::from_config(
//!     Arc::new(MemoryStore::new()),
//!     ValidatorConfig::default(),
//! )?;
//! let validator = Validator::compile(&form, services);
//!
//! let data = json!({"age": 16}).as_object().cloned().unwrap();
//! let context = SubmissionContext::new("signup", data.clone());
//! let verdict = validator.validate(&data, &context).await?;
//! assert_eq!(verdict.errors()[0].message, "Too young");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod context;
pub mod error;
pub mod rules;
pub mod unique;
pub mod validator;
pub mod verdict;

pub use cache::{FormLoader, MemoryFormLoader, ValidatorCache};
pub use context::SubmissionContext;
pub use error::{Result, ValidatorError};
pub use rules::{evaluate_custom_rules, substitute_placeholder};
pub use unique::{check_unique, unique_query};
pub use validator::{sandbox_limits, ValidationServices, Validator};
pub use verdict::{FailureCategory, FieldError, ValidationVerdict};
