//! Compiled form: schema plus the custom-rule and unique-field side tables.

use indexmap::IndexMap;

use crate::flatten::flatten;
use crate::schema::{FieldConstraint, ValidationSchema};
use crate::types::{FieldComponent, FormDefinition};

/// Ordered mapping from field key to the component that owns it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable(IndexMap<String, FieldComponent>);

impl FieldTable {
    pub fn get(&self, key: &str) -> Option<&FieldComponent> {
        self.0.get(key)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldComponent)> {
        self.0.iter().map(|(key, component)| (key.as_str(), component))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, component: &FieldComponent) {
        self.0.insert(component.key.clone(), component.clone());
    }
}

/// Everything derived from a form's components, built once per form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledForm {
    pub schema: ValidationSchema,
    /// Fields with a non-empty custom rule
    pub custom_rules: FieldTable,
    /// Fields declared unique
    pub unique_fields: FieldTable,
}

impl CompiledForm {
    /// Compile an already flattened component list in a single pass.
    ///
    /// Components without a key are skipped. A later component with the same
    /// key replaces the earlier one. Compilation never fails.
    pub fn compile(flat: &[FieldComponent]) -> Self {
        let mut compiled = CompiledForm::default();

        for component in flat.iter().filter(|c| !c.key.is_empty()) {
            if component.unique {
                compiled.unique_fields.insert(component);
            }
            if component.custom_rule().is_some() {
                compiled.custom_rules.insert(component);
            }
            compiled
                .schema
                .insert(component.key.clone(), FieldConstraint::for_component(component));
        }

        tracing::debug!(
            fields = compiled.schema.len(),
            custom_rules = compiled.custom_rules.len(),
            unique_fields = compiled.unique_fields.len(),
            "compiled form"
        );
        compiled
    }

    /// Flatten and compile a form definition
    pub fn from_form(form: &FormDefinition) -> Self {
        Self::compile(&flatten(&form.components))
    }
}
