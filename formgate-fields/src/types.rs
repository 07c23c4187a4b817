//! Form component model.
//!
//! Form definitions arrive as JSON authored elsewhere, so parsing is
//! forgiving: unknown attributes are ignored, malformed child nodes are
//! dropped, and type names outside the known vocabulary are preserved.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// The type of a field, which selects its base constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single-line text (`textfield`, `text`)
    Text,
    /// Multi-line text
    Textarea,
    /// Phone number (`phonenumber`, `phone`), validated as text
    Phone,
    Email,
    Number,
    /// Any other component type; values pass through unchecked
    Other(String),
}

impl FieldType {
    /// Canonical type name, used in error kinds such as `textfield.custom`
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "textfield",
            FieldType::Textarea => "textarea",
            FieldType::Phone => "phonenumber",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Other(name) => name,
        }
    }

    /// Text, textarea and phone share the string-with-length constraint.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Textarea | FieldType::Phone
        )
    }
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Other(String::new())
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        match name {
            "textfield" | "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "phonenumber" | "phone" => FieldType::Phone,
            "email" => FieldType::Email,
            "number" => FieldType::Number,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::from(name.as_str())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint bundle attached to a component under `validate`.
///
/// Numeric bounds are kept as raw JSON so that malformed values can be
/// skipped at compile time instead of failing the whole form. Other
/// attributes fall back to their default when ill-typed, and attributes
/// without a typed counterpart are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateBundle {
    #[serde(deserialize_with = "lenient")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greater: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub less: Option<Value>,
    /// Custom rule source
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    /// Attributes such as `customMessage` that are only passed through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidateBundle {
    /// The regex pattern, if one was given and is non-empty
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// The custom rule source, if one was given and is non-empty
    pub fn custom(&self) -> Option<&str> {
        self.custom.as_deref().filter(|c| !c.is_empty())
    }
}

/// One column of a column layout, or one cell of a table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    #[serde(deserialize_with = "lenient_components")]
    pub components: Vec<FieldComponent>,
}

/// A node in the form component tree.
///
/// A node is a container when it carries `components`, `columns` or `rows`;
/// everything else is a leaf field. A node is rejected only when it is not
/// an object or its `key` is not a string. Ill-typed attributes fall back to
/// their defaults, and unmodelled attributes (`properties`, `defaultValue`)
/// are kept in `extra` so rules see the node as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldComponent {
    /// Field key; dotted keys denote embedded fields
    pub key: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub type_: FieldType,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub multiple: bool,
    #[serde(deserialize_with = "lenient_persistent")]
    pub persistent: bool,
    #[serde(deserialize_with = "lenient")]
    pub unique: bool,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidateBundle>,
    #[serde(
        deserialize_with = "lenient_optional_components",
        skip_serializing_if = "Option::is_none"
    )]
    pub components: Option<Vec<FieldComponent>>,
    #[serde(
        deserialize_with = "lenient_columns",
        skip_serializing_if = "Option::is_none"
    )]
    pub columns: Option<Vec<Column>>,
    #[serde(
        deserialize_with = "lenient_rows",
        skip_serializing_if = "Option::is_none"
    )]
    pub rows: Option<Vec<Vec<Column>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FieldComponent {
    fn default() -> Self {
        Self {
            key: String::new(),
            type_: FieldType::default(),
            label: None,
            multiple: false,
            persistent: true,
            unique: false,
            validate: None,
            components: None,
            columns: None,
            rows: None,
            extra: Map::new(),
        }
    }
}

impl FieldComponent {
    /// Create a leaf field
    pub fn new(key: impl Into<String>, type_: FieldType) -> Self {
        Self {
            key: key.into(),
            type_,
            ..Default::default()
        }
    }

    /// Create a container holding the given children
    pub fn container(type_: impl Into<String>, children: Vec<FieldComponent>) -> Self {
        Self {
            type_: FieldType::Other(type_.into()),
            components: Some(children),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_validate(mut self, validate: ValidateBundle) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    /// True when this node holds child components
    pub fn is_container(&self) -> bool {
        self.components.is_some() || self.columns.is_some() || self.rows.is_some()
    }

    /// Label for messages, falling back to the key
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(self.key.as_str())
    }

    /// The custom rule source, if any
    pub fn custom_rule(&self) -> Option<&str> {
        self.validate.as_ref().and_then(ValidateBundle::custom)
    }

    /// True for keys that address a field nested inside another value
    pub fn is_embedded(&self) -> bool {
        formgate_common::is_embedded_key(&self.key)
    }

    /// Direct children in declaration order: `components`, then each column,
    /// then each table cell row by row.
    pub fn children(&self) -> impl Iterator<Item = &FieldComponent> {
        let components = self.components.iter().flatten();
        let columns = self
            .columns
            .iter()
            .flatten()
            .flat_map(|column| column.components.iter());
        let rows = self
            .rows
            .iter()
            .flatten()
            .flatten()
            .flat_map(|cell| cell.components.iter());
        components.chain(columns).chain(rows)
    }
}

/// A complete form: its identifier and component tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefinition {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_components")]
    pub components: Vec<FieldComponent>,
}

impl FormDefinition {
    pub fn new(id: impl Into<String>, components: Vec<FieldComponent>) -> Self {
        Self {
            id: id.into(),
            title: None,
            components,
        }
    }

    /// Parse a form from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a form from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Deserialize an attribute, falling back to its default when ill-typed.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
        tracing::debug!("ignoring ill-typed attribute: {e}");
        T::default()
    }))
}

/// `persistent` defaults to true, including when it is ill-typed
fn lenient_persistent<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(persistent) => Ok(persistent),
        _ => Ok(true),
    }
}

/// Deserialize a component list, dropping entries that do not parse.
fn lenient_components<'de, D>(deserializer: D) -> std::result::Result<Vec<FieldComponent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_items(raw).unwrap_or_default())
}

fn lenient_optional_components<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<FieldComponent>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_items(raw))
}

fn lenient_columns<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<Column>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_items(raw))
}

/// Rows are parsed cell by cell, so one bad cell or row only drops itself.
fn lenient_rows<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<Vec<Column>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(rows)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        rows.into_iter()
            .filter_map(|row| parse_items::<Column>(Some(row)))
            .collect(),
    ))
}

/// Parse each element of a JSON array, skipping elements that do not parse.
/// Anything other than an array yields `None`.
fn parse_items<T: DeserializeOwned>(raw: Option<Value>) -> Option<Vec<T>> {
    let Some(Value::Array(items)) = raw else {
        return None;
    };
    let parsed = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!("skipping malformed form node: {e}");
                None
            }
        })
        .collect();
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_type_aliases() {
        assert_eq!(FieldType::from("text"), FieldType::Text);
        assert_eq!(FieldType::from("textfield"), FieldType::Text);
        assert_eq!(FieldType::from("phone"), FieldType::Phone);
        assert_eq!(FieldType::from("phonenumber"), FieldType::Phone);
        assert_eq!(
            FieldType::from("select"),
            FieldType::Other("select".to_string())
        );
    }

    #[test]
    fn field_type_serializes_canonical_name() {
        let value = serde_json::to_value(FieldType::Phone).unwrap();
        assert_eq!(value, json!("phonenumber"));
        assert_eq!(FieldType::Other("signature".into()).to_string(), "signature");
    }

    #[test]
    fn component_defaults() {
        let component: FieldComponent =
            serde_json::from_value(json!({"key": "name", "type": "textfield"})).unwrap();
        assert_eq!(component.type_, FieldType::Text);
        assert!(component.persistent);
        assert!(!component.multiple);
        assert!(!component.unique);
        assert!(!component.is_container());
        assert_eq!(component.display_name(), "name");
    }

    #[test]
    fn validate_bundle_camel_case() {
        let component: FieldComponent = serde_json::from_value(json!({
            "key": "name",
            "type": "textfield",
            "label": "Name",
            "validate": {"required": true, "minLength": 3, "maxLength": "", "custom": ""}
        }))
        .unwrap();
        let validate = component.validate.as_ref().unwrap();
        assert!(validate.required);
        assert_eq!(validate.min_length, Some(json!(3)));
        assert_eq!(validate.max_length, Some(json!("")));
        assert!(component.custom_rule().is_none());
        assert_eq!(component.display_name(), "Name");
    }

    #[test]
    fn malformed_children_are_skipped() {
        let form = FormDefinition::from_value(json!({
            "_id": "form1",
            "components": [
                {"key": "a", "type": "textfield"},
                42,
                {"key": ["not", "a", "string"]},
                {"type": "panel", "components": [{"key": "b", "type": "number"}, "junk"]}
            ]
        }))
        .unwrap();
        assert_eq!(form.id, "form1");
        assert_eq!(form.components.len(), 2);
        let panel = &form.components[1];
        assert!(panel.is_container());
        assert_eq!(panel.children().count(), 1);
    }

    #[test]
    fn children_order_covers_columns_and_rows() {
        let component: FieldComponent = serde_json::from_value(json!({
            "type": "layout",
            "components": [{"key": "a"}],
            "columns": [{"components": [{"key": "b"}]}, {"components": [{"key": "c"}]}],
            "rows": [[{"components": [{"key": "d"}]}], [{"components": [{"key": "e"}]}]]
        }))
        .unwrap();
        let keys: Vec<_> = component.children().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn ill_typed_attributes_fall_back_to_defaults() {
        let component: FieldComponent = serde_json::from_value(json!({
            "key": "name",
            "type": 7,
            "label": {"en": "Name"},
            "unique": true,
            "multiple": "yes",
            "persistent": null,
            "validate": {"required": true, "minLength": 3, "pattern": 123, "custom": false}
        }))
        .unwrap();
        assert_eq!(component.key, "name");
        assert_eq!(component.type_, FieldType::default());
        assert!(component.label.is_none());
        assert!(component.unique);
        assert!(!component.multiple);
        assert!(component.persistent);

        let validate = component.validate.as_ref().unwrap();
        assert!(validate.required);
        assert_eq!(validate.min_length, Some(json!(3)));
        assert!(validate.pattern().is_none());
        assert!(component.custom_rule().is_none());
    }

    #[test]
    fn bad_table_cell_only_drops_itself() {
        let component: FieldComponent = serde_json::from_value(json!({
            "type": "table",
            "rows": [
                [{"components": [{"key": "age", "validate": {"required": true}}]}, null],
                "junk",
                [7, {"components": [{"key": "city"}]}]
            ],
            "columns": [null, {"components": [{"key": "zip"}]}]
        }))
        .unwrap();
        let keys: Vec<_> = component.children().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["zip", "age", "city"]);
    }

    #[test]
    fn unmodelled_attributes_are_kept() {
        let component: FieldComponent = serde_json::from_value(json!({
            "key": "age",
            "type": "number",
            "properties": {"minimum": 18},
            "defaultValue": 21,
            "validate": {"custom": "valid = true;", "customMessage": "Too young"}
        }))
        .unwrap();
        assert_eq!(component.extra.get("properties"), Some(&json!({"minimum": 18})));
        assert_eq!(
            component.validate.as_ref().unwrap().extra.get("customMessage"),
            Some(&json!("Too young"))
        );

        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["properties"]["minimum"], json!(18));
        assert_eq!(value["defaultValue"], json!(21));
        assert_eq!(value["validate"]["customMessage"], json!("Too young"));
    }

    #[test]
    fn whitespace_rule_is_still_a_rule() {
        let validate = ValidateBundle {
            custom: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(validate.custom(), Some("  "));
    }

    #[test]
    fn non_array_components_is_leaf() {
        let component: FieldComponent =
            serde_json::from_value(json!({"key": "x", "components": "oops"})).unwrap();
        assert!(!component.is_container());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(FormDefinition::from_json("{not json").is_err());
    }
}
