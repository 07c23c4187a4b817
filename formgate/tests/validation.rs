//! End-to-end validation behaviour against an in-memory store

use std::sync::Arc;
use std::time::Duration;

use formgate::{
    FailureCategory, SubmissionContext, ValidationServices, ValidationVerdict, Validator,
    ValidatorError,
};
use formgate_config::ValidatorConfig;
use formgate_fields::FormDefinition;
use formgate_store::{MemoryStore, StoreError};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn config() -> ValidatorConfig {
    ValidatorConfig {
        script_timeout_ms: 200,
        script_workers: 1,
        ..Default::default()
    }
}

fn validator(form: Value, store: Arc<MemoryStore>) -> Validator {
    let form = FormDefinition::from_value(form).unwrap();
    let services = ValidationServices::from_config(store, config()).unwrap();
    Validator::compile(&form, services)
}

async fn run(validator: &Validator, data: Value) -> Result<ValidationVerdict, ValidatorError> {
    let data = object(data);
    let context = SubmissionContext::new("f1", data.clone());
    validator.validate(&data, &context).await
}

fn custom_rule_form(rule: &str) -> Value {
    json!({
        "_id": "f1",
        "components": [
            {"key": "amount", "type": "textfield", "label": "Amount", "validate": {"custom": rule}}
        ]
    })
}

fn unique_form() -> Value {
    json!({
        "_id": "f1",
        "components": [
            {"key": "username", "type": "textfield", "label": "Username", "unique": true},
            {"type": "panel", "components": [
                {"key": "email", "type": "email", "label": "Email", "unique": true}
            ]},
            {"key": "profile.handle", "type": "textfield", "unique": true}
        ]
    })
}

fn stored(id: &str, data: Value) -> Value {
    json!({"_id": id, "form": "f1", "data": data})
}

#[tokio::test]
async fn custom_rule_rejects_and_accepts() {
    let validator = validator(
        custom_rule_form("valid = input > 10;"),
        Arc::new(MemoryStore::new()),
    );

    let verdict = run(&validator, json!({"amount": 5})).await.unwrap();
    let errors = verdict.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_key, "amount");
    assert_eq!(errors[0].kind, "textfield.custom");
    assert_eq!(errors[0].category, FailureCategory::CustomValidation);

    // 15 passes the rule but is not a string, so the schema rejects it
    let verdict = run(&validator, json!({"amount": 15})).await.unwrap();
    assert_eq!(verdict.errors()[0].category, FailureCategory::Schema);

    let verdict = run(&validator, json!({"amount": "15"})).await.unwrap();
    assert!(verdict.is_valid(), "{verdict:?}");
}

#[tokio::test]
async fn custom_rule_message_is_reported() {
    let validator = validator(
        custom_rule_form("valid = input.length < 4 ? true : 'Amount is too long';"),
        Arc::new(MemoryStore::new()),
    );
    let verdict = run(&validator, json!({"amount": "12345"})).await.unwrap();
    assert_eq!(verdict.errors()[0].message, "Amount is too long");
}

#[tokio::test]
async fn custom_rule_exception_becomes_failure() {
    let validator = validator(
        custom_rule_form("valid = input.nope.deeper;"),
        Arc::new(MemoryStore::new()),
    );
    let verdict = run(&validator, json!({"amount": "1"})).await.unwrap();
    let error = &verdict.errors()[0];
    assert_eq!(error.category, FailureCategory::CustomValidation);
    assert!(error.message.starts_with("TypeError"), "{}", error.message);
}

#[tokio::test]
async fn runaway_rule_times_out_as_failure() {
    let validator = validator(
        custom_rule_form("while (true) {}"),
        Arc::new(MemoryStore::new()),
    );
    let verdict = run(&validator, json!({"amount": "1"})).await.unwrap();
    let error = &verdict.errors()[0];
    assert_eq!(error.category, FailureCategory::CustomValidation);
    assert!(error.message.contains("execution budget"), "{}", error.message);
}

#[tokio::test]
async fn rule_skipped_when_field_absent() {
    let validator = validator(
        custom_rule_form("valid = false;"),
        Arc::new(MemoryStore::new()),
    );
    let verdict = run(&validator, json!({})).await.unwrap();
    assert!(verdict.is_valid());
}

#[tokio::test]
async fn placeholder_reads_full_payload() {
    let form = json!({
        "_id": "f1",
        "components": [
            {"key": "password", "type": "textfield"},
            {"key": "confirm", "type": "textfield",
             "validate": {"custom": "valid = input === '{{ password }}' ? true : 'Passwords must match';"}}
        ]
    });
    let validator = validator(form, Arc::new(MemoryStore::new()));

    let verdict = run(&validator, json!({"password": "s3cret", "confirm": "s3cret"}))
        .await
        .unwrap();
    assert!(verdict.is_valid());

    let verdict = run(&validator, json!({"password": "s3cret", "confirm": "other"}))
        .await
        .unwrap();
    assert_eq!(verdict.errors()[0].message, "Passwords must match");

    // The compiled rule keeps its placeholder between calls
    let source = validator
        .compiled()
        .custom_rules
        .get("confirm")
        .and_then(|c| c.custom_rule())
        .unwrap();
    assert!(source.contains("{{ password }}"));
}

#[tokio::test]
async fn uniqueness_violation_and_self_update() {
    let store = Arc::new(MemoryStore::with_documents(vec![stored(
        "s1",
        json!({"username": "ada", "email": "ada@example.com"}),
    )]));
    let validator = validator(unique_form(), store.clone());
    let data = object(json!({"username": "ada", "email": "new@example.com"}));

    let context = SubmissionContext::new("f1", data.clone());
    let verdict = validator.validate(&data, &context).await.unwrap();
    let error = &verdict.errors()[0];
    assert_eq!(error.category, FailureCategory::UniquenessViolation);
    assert_eq!(error.message, "Username must be unique.");

    let context = SubmissionContext::new("f1", data.clone()).with_existing_id("s1");
    let verdict = validator.validate(&data, &context).await.unwrap();
    assert!(verdict.is_valid(), "{verdict:?}");
}

#[tokio::test]
async fn deleted_records_do_not_conflict() {
    let store = Arc::new(MemoryStore::with_documents(vec![json!({
        "_id": "s1",
        "form": "f1",
        "data": {"username": "ada", "email": "ada@example.com"},
        "deleted": 1700000000
    })]));
    let validator = validator(unique_form(), store);
    let verdict = run(&validator, json!({"username": "ada", "email": "ada@example.com"}))
        .await
        .unwrap();
    assert!(verdict.is_valid());
}

#[tokio::test]
async fn missing_top_level_unique_field() {
    let store = Arc::new(MemoryStore::new());
    let validator = validator(unique_form(), store.clone());

    let verdict = run(&validator, json!({"username": "ada"})).await.unwrap();
    let error = &verdict.errors()[0];
    assert_eq!(error.category, FailureCategory::MissingRequiredUnique);
    assert_eq!(error.field_key, "email");

    // The nested unique field may be absent
    let verdict = run(&validator, json!({"username": "ada", "email": "a@b.co"}))
        .await
        .unwrap();
    assert!(verdict.is_valid());
}

#[tokio::test]
async fn first_unique_failure_stops_lookups() {
    let store = Arc::new(MemoryStore::with_documents(vec![stored(
        "s1",
        json!({"username": "ada", "email": "ada@example.com"}),
    )]));
    let validator = validator(unique_form(), store.clone());

    let verdict = run(&validator, json!({"username": "ada", "email": "ada@example.com"}))
        .await
        .unwrap();
    assert_eq!(verdict.errors().len(), 1);
    assert_eq!(verdict.errors()[0].field_key, "username");
    assert_eq!(store.lookup_count(), 1);
}

#[tokio::test]
async fn custom_failure_preempts_uniqueness() {
    let form = json!({
        "_id": "f1",
        "components": [
            {"key": "username", "type": "textfield", "unique": true,
             "validate": {"custom": "valid = 'nope';"}}
        ]
    });
    let store = Arc::new(MemoryStore::new());
    let validator = validator(form, store.clone());
    let verdict = run(&validator, json!({"username": "ada"})).await.unwrap();
    assert_eq!(verdict.errors()[0].category, FailureCategory::CustomValidation);
    assert_eq!(store.lookup_count(), 0);
}

#[tokio::test]
async fn store_failure_is_an_error() {
    let store = Arc::new(MemoryStore::new().fail_with(StoreError::unavailable("offline")));
    let validator = validator(unique_form(), store);
    let err = run(&validator, json!({"username": "ada", "email": "a@b.co"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidatorError::StoreLookup { .. }));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_secs(30)));
    let validator = validator(unique_form(), store);
    let err = run(&validator, json!({"username": "ada", "email": "a@b.co"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidatorError::StoreTimeout { .. }));
}

#[tokio::test]
async fn cancellation_aborts_lookup() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_secs(30)));
    let validator = validator(unique_form(), store);
    let data = object(json!({"username": "ada", "email": "a@b.co"}));
    let token = CancellationToken::new();
    let context = SubmissionContext::new("f1", data.clone()).with_cancellation(token.clone());

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = validator.validate(&data, &context).await.unwrap_err();
    cancel.await.unwrap();
    assert!(matches!(err, ValidatorError::Cancelled));
}

#[tokio::test]
async fn schema_errors_are_batched_and_unknown_keys_stripped() {
    let form = json!({
        "_id": "f1",
        "components": [
            {"key": "name", "type": "textfield", "label": "Name",
             "validate": {"required": true, "minLength": 3, "maxLength": 5}},
            {"key": "price", "type": "number", "validate": {"step": "0.01"}},
            {"key": "email", "type": "email"}
        ]
    });
    let validator = validator(form, Arc::new(MemoryStore::new()));

    let verdict = run(&validator, json!({"name": "ab", "price": 1.234, "email": "bad"}))
        .await
        .unwrap();
    let kinds: Vec<_> = verdict.errors().iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["string.min", "number.precision", "string.email"]);

    let verdict = run(
        &validator,
        json!({"_id": "s1", "name": "abcd", "price": "3.14", "extra": "drop me"}),
    )
    .await
    .unwrap();
    let data = verdict.data().unwrap();
    assert_eq!(data.get("price"), Some(&json!(3.14)));
    assert_eq!(data.get("_id"), Some(&json!("s1")));
    assert!(!data.contains_key("extra"));
}

#[tokio::test]
async fn caller_record_is_not_mutated() {
    let validator = validator(
        json!({"_id": "f1", "components": [{"key": "qty", "type": "number"}]}),
        Arc::new(MemoryStore::new()),
    );
    let data = object(json!({"qty": "4", "junk": true}));
    let before = data.clone();
    let context = SubmissionContext::new("f1", data.clone());
    let verdict = validator.validate(&data, &context).await.unwrap();
    assert!(verdict.is_valid());
    assert_eq!(data, before);
}

#[tokio::test]
async fn concurrent_validations_share_one_validator() {
    let validator = Arc::new(validator(
        custom_rule_form("valid = input.length > 1 || 'short';"),
        Arc::new(MemoryStore::new()),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let validator = Arc::clone(&validator);
        handles.push(tokio::spawn(async move {
            let value = if i % 2 == 0 { "ok" } else { "x" };
            let data = object(json!({ "amount": value }));
            let context = SubmissionContext::new("f1", data.clone());
            (i, validator.validate(&data, &context).await.unwrap())
        }));
    }
    for handle in handles {
        let (i, verdict) = handle.await.unwrap();
        assert_eq!(verdict.is_valid(), i % 2 == 0);
    }
}

#[tokio::test]
async fn empty_context_form_uses_validator_form() {
    let store = Arc::new(MemoryStore::with_documents(vec![stored(
        "s1",
        json!({"username": "ada", "email": "x@y.zz"}),
    )]));
    let validator = validator(unique_form(), store);
    let data = object(json!({"username": "ada", "email": "a@b.co"}));
    let context = SubmissionContext {
        data: data.clone(),
        ..Default::default()
    };
    let verdict = validator.validate(&data, &context).await.unwrap();
    assert_eq!(verdict.errors()[0].category, FailureCategory::UniquenessViolation);
}
