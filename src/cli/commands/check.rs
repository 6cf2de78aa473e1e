//! Check command implementation
//!
//! Runs one payload through one contract and prints either the normalized
//! value or the full violation list as JSON on stdout.

use super::read_json;
use crate::config::load_config_or_default;
use crate::core::validator::Validator;
use crate::domain::ValidationErrors;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::Value;

/// Contracts selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Patient,
    Create,
    Update,
    Query,
    Merge,
    Export,
    Anonymize,
    Archive,
    Restore,
    BulkImport,
    SendCommunication,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Contract to validate against
    #[arg(value_enum)]
    pub contract: Contract,

    /// JSON file to validate, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Evaluate date rules as of this RFC 3339 instant instead of now
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

fn normalized<T: Serialize>(
    result: Result<T, ValidationErrors>,
) -> anyhow::Result<Result<Value, ValidationErrors>> {
    match result {
        Ok(value) => Ok(Ok(serde_json::to_value(value)?)),
        Err(errors) => Ok(Err(errors)),
    }
}

impl CheckArgs {
    /// Validates `raw` with the selected contract
    pub fn run(
        &self,
        validator: &Validator,
        raw: &Value,
    ) -> anyhow::Result<Result<Value, ValidationErrors>> {
        match self.contract {
            Contract::Patient => normalized(validator.validate_patient(raw)),
            Contract::Create => normalized(validator.validate_create(raw)),
            Contract::Update => normalized(validator.validate_update(raw)),
            Contract::Query => normalized(validator.validate_query(raw)),
            Contract::Merge => normalized(validator.validate_merge(raw)),
            Contract::Export => normalized(validator.validate_export(raw)),
            Contract::Anonymize => normalized(validator.validate_anonymize(raw)),
            Contract::Archive => normalized(validator.validate_archive(raw)),
            Contract::Restore => normalized(validator.validate_restore(raw)),
            Contract::BulkImport => normalized(validator.validate_bulk_import(raw)),
            Contract::SendCommunication => {
                normalized(validator.validate_send_communication(raw))
            }
        }
    }

    fn print(&self, value: &impl Serialize) -> anyhow::Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{text}");
        Ok(())
    }

    /// Execute the check command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(contract = ?self.contract, input = %self.input, "Checking payload");

        let config = match load_config_or_default(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let raw = match read_json(&self.input) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("❌ {e:#}");
                return Ok(2);
            }
        };

        let mut validator = Validator::from_config(&config);
        if let Some(now) = self.now {
            validator = validator.at(now);
        }

        match self.run(&validator, &raw)? {
            Ok(value) => {
                self.print(&value)?;
                Ok(0)
            }
            Err(errors) => {
                eprintln!("❌ {} violation(s)", errors.len());
                self.print(&errors)?;
                Ok(1)
            }
        }
    }
}
