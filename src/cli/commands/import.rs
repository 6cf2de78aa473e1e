//! Import command implementation
//!
//! Validates a bulk import request and plans it against an in-memory store
//! seeded with existing patients. Nothing leaves the process: the store is
//! dropped when the command ends, so every run is effectively a dry run.

use super::read_json;
use crate::adapters::MemoryPatientStore;
use crate::config::load_config_or_default;
use crate::core::import::{run_import, validate_concurrently};
use crate::core::validator::Validator;
use crate::domain::ContractError;
use crate::schema::patient::Patient;
use anyhow::bail;
use clap::Args;
use serde_json::Value;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Bulk import request (JSON), or `-` for stdin
    pub input: String,

    /// JSON array of existing canonical patients to plan against
    #[arg(long)]
    pub seed: Option<String>,

    /// Operator recorded as creator of imported records
    #[arg(long, default_value = "patient-contracts-cli")]
    pub actor: String,

    /// Override the configured number of validation workers
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Validates every seed record; a broken seed is an input error
fn seed_patients(validator: &Validator, raw: &Value) -> anyhow::Result<Vec<Patient>> {
    let Value::Array(items) = raw else {
        bail!("seed file must contain a JSON array of patients");
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            validator
                .validate_patient(item)
                .map_err(|errors| anyhow::anyhow!("seed patient [{index}] is invalid: {errors}"))
        })
        .collect()
}

impl ImportArgs {
    /// Execute the import command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input, seed = ?self.seed, "Starting import command");

        let config = match load_config_or_default(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        let validator = Validator::from_config(&config);
        let concurrency = self.concurrency.unwrap_or(config.import.concurrency);

        let raw = match read_json(&self.input) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("❌ {e:#}");
                return Ok(2);
            }
        };

        let seeds = match &self.seed {
            Some(path) => match read_json(path).and_then(|raw| seed_patients(&validator, &raw)) {
                Ok(seeds) => seeds,
                Err(e) => {
                    eprintln!("❌ {e:#}");
                    return Ok(2);
                }
            },
            None => Vec::new(),
        };
        let store = MemoryPatientStore::seeded(seeds).await?;

        let request = match validate_concurrently(&validator, &raw, concurrency).await {
            Ok(request) => request,
            Err(ContractError::Validation(errors)) => {
                eprintln!("❌ Import request rejected: {} violation(s)", errors.len());
                println!("{}", serde_json::to_string_pretty(&errors)?);
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        };

        let summary = run_import(&validator, &store, request, &self.actor).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);

        eprintln!(
            "{} {} element(s): {} invalid, {} created, {} updated, {} skipped, {} conflict(s)",
            if summary.is_clean() { "✅" } else { "⚠️ " },
            summary.total,
            summary.invalid,
            summary.created,
            summary.updated,
            summary.skipped,
            summary.conflicts
        );

        Ok(if summary.is_clean() { 0 } else { 1 })
    }
}
