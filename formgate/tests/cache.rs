//! Compiled validator cache

use std::sync::Arc;

use formgate::{MemoryFormLoader, SubmissionContext, ValidationServices, ValidatorCache, ValidatorError};
use formgate_config::ValidatorConfig;
use formgate_fields::FormDefinition;
use formgate_store::MemoryStore;
use serde_json::json;

fn form(id: &str, min_length: u64) -> FormDefinition {
    FormDefinition::from_value(json!({
        "_id": id,
        "components": [
            {"key": "name", "type": "textfield", "validate": {"minLength": min_length}}
        ]
    }))
    .unwrap()
}

fn cache(loader: Arc<MemoryFormLoader>) -> ValidatorCache {
    let config = ValidatorConfig {
        script_workers: 1,
        ..Default::default()
    };
    let services = ValidationServices::from_config(Arc::new(MemoryStore::new()), config).unwrap();
    ValidatorCache::new(loader, services)
}

#[tokio::test]
async fn compiles_once_per_form() {
    let loader = Arc::new(MemoryFormLoader::new());
    loader.insert(form("a", 2));
    loader.insert(form("b", 2));
    let cache = cache(loader.clone());

    let first = cache.get_or_compile("a").await.unwrap();
    let second = cache.get_or_compile("a").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.load_count(), 1);

    let _ = cache.get_or_compile("b").await.unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn invalidate_picks_up_new_definition() {
    let loader = Arc::new(MemoryFormLoader::new());
    loader.insert(form("a", 2));
    let cache = cache(loader.clone());

    let data = json!({"name": "abc"}).as_object().cloned().unwrap();
    let context = SubmissionContext::new("a", data.clone());

    let validator = cache.get_or_compile("a").await.unwrap();
    assert!(validator.validate(&data, &context).await.unwrap().is_valid());

    loader.insert(form("a", 5));
    assert!(cache.invalidate("a"));
    assert!(!cache.invalidate("a"));
    assert!(cache.is_empty());

    let validator = cache.get_or_compile("a").await.unwrap();
    assert!(!validator.validate(&data, &context).await.unwrap().is_valid());
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn unknown_form_is_an_error() {
    let cache = cache(Arc::new(MemoryFormLoader::new()));
    let err = cache.get_or_compile("missing").await.unwrap_err();
    assert!(matches!(err, ValidatorError::FormLoad { ref form_id, .. } if form_id == "missing"));
    assert!(cache.is_empty());
}
