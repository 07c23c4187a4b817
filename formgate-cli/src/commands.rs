//! Command implementations
//!
//! Commands return their stdout text and exit code instead of printing, so
//! they can be driven in-process by tests.

use std::path::Path;
use std::sync::Arc;

use formgate::{SubmissionContext, ValidationServices, Validator};
use formgate_config::{ConfigProvider, ValidatorConfig};
use formgate_fields::{CompiledForm, FormDefinition};
use formgate_store::MemoryStore;
use serde_json::{json, Map, Value};

use crate::cli::{Cli, Commands};
use crate::error::{CliError, CliResult};
use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID, EXIT_SUCCESS};

/// What a command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Run the selected command
pub async fn execute(cli: &Cli) -> CliResult<CommandOutput> {
    match &cli.command {
        Commands::Validate {
            form,
            submission,
            records,
            existing_id,
        } => {
            let config = load_config(cli.config.as_deref())?;
            validate(
                form,
                submission,
                records.as_deref(),
                existing_id.as_deref(),
                config,
            )
            .await
        }
        Commands::Schema { form } => schema(form),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<ValidatorConfig> {
    let provider = match path {
        Some(path) => ConfigProvider::new().with_file(path),
        None => ConfigProvider::new(),
    };
    let config = provider
        .load()
        .map_err(|e| CliError::with_source("invalid configuration", e))?;
    tracing::debug!("configuration: {}", formgate_common::Pretty(&config));
    Ok(config)
}

fn read_json(path: &Path) -> CliResult<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
    serde_json::from_str(&text).map_err(|e| CliError::input(path, e))
}

fn read_form(path: &Path) -> CliResult<FormDefinition> {
    let value = read_json(path)?;
    FormDefinition::from_value(value).map_err(|e| CliError::input(path, e))
}

fn read_object(path: &Path) -> CliResult<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::new(
            format!("{} must contain a JSON object", path.display()),
            EXIT_ERROR,
        )),
    }
}

fn read_records(path: &Path) -> CliResult<Vec<Value>> {
    match read_json(path)? {
        Value::Array(records) => Ok(records),
        _ => Err(CliError::new(
            format!("{} must contain a JSON array", path.display()),
            EXIT_ERROR,
        )),
    }
}

fn to_pretty(value: &impl serde::Serialize) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::with_source("failed to render output", e))
}

async fn validate(
    form_path: &Path,
    submission_path: &Path,
    records_path: Option<&Path>,
    existing_id: Option<&str>,
    config: ValidatorConfig,
) -> CliResult<CommandOutput> {
    let form = read_form(form_path)?;
    let data = read_object(submission_path)?;
    let records = match records_path {
        Some(path) => read_records(path)?,
        None => Vec::new(),
    };
    tracing::info!(form = %form.id, records = records.len(), "validating submission");

    let store = Arc::new(MemoryStore::with_documents(records));
    let services = ValidationServices::from_config(store, config)
        .map_err(|e| CliError::with_source("cannot start validator", e))?;
    let validator = Validator::compile(&form, services);

    let mut context = SubmissionContext::new(form.id.clone(), data.clone());
    if let Some(id) = existing_id {
        context = context.with_existing_id(id);
    }

    let verdict = validator
        .validate(&data, &context)
        .await
        .map_err(|e| CliError::with_source("validation aborted", e))?;

    Ok(CommandOutput {
        stdout: to_pretty(&verdict)?,
        exit_code: if verdict.is_valid() {
            EXIT_SUCCESS
        } else {
            EXIT_INVALID
        },
    })
}

fn schema(form_path: &Path) -> CliResult<CommandOutput> {
    let form = read_form(form_path)?;
    let compiled = CompiledForm::from_form(&form);
    let summary = json!({
        "form": form.id,
        "fields": compiled.schema.describe(),
        "customRules": compiled.custom_rules.keys().collect::<Vec<_>>(),
        "uniqueFields": compiled.unique_fields.keys().collect::<Vec<_>>(),
    });
    Ok(CommandOutput {
        stdout: to_pretty(&summary)?,
        exit_code: EXIT_SUCCESS,
    })
}
