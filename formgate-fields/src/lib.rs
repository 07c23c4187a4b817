//! Form component model and schema compilation for Formgate.
//!
//! A form arrives as a tree of [`FieldComponent`]s. [`flatten`] turns the
//! tree into its ordered leaves, and [`CompiledForm::compile`] builds, in one
//! pass, the [`ValidationSchema`] together with the side tables of custom
//! rules and unique fields. A compiled form is immutable and can be shared
//! across any number of concurrent validations.
//!
//! ```
//! use formgate_fields::{CompiledForm, FormDefinition};
//! use serde_json::json;
//!
//! let form = FormDefinition::from_value(json!({
//!     "_id": "signup",
//!     "components": [
//!         {"key": "name", "type": "textfield", "validate": {"required": true, "minLength": 3}}
//!     ]
//! })).unwrap();
//!
//! let compiled = CompiledForm::from_form(&form);
//! let record = json!({"name": "Ada", "spam": 1});
//! let sanitized = compiled.schema.apply(record.as_object().unwrap()).unwrap();
//! assert!(!sanitized.contains_key("spam"));
//! ```

pub mod error;
pub mod flatten;
pub mod schema;
pub mod tables;
pub mod types;

pub use error::{FieldsError, Result};
pub use flatten::flatten;
pub use schema::{
    BaseConstraint, FieldConstraint, FieldSummary, Pattern, SchemaViolation, StepRule,
    ValidationSchema, ID_KEY,
};
pub use tables::{CompiledForm, FieldTable};
pub use types::{Column, FieldComponent, FieldType, FormDefinition, ValidateBundle};
