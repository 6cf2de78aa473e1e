//! CLI interface and argument parsing
//!
//! Exit codes: `0` success, `1` the input was rejected, `2` configuration or
//! input could not be read, `5` fatal error.

pub mod commands;

use clap::{Parser, Subcommand};

/// Patient Contracts - validate and normalize patient record payloads
#[derive(Parser, Debug)]
#[command(name = "patient-contracts")]
#[command(version, about, long_about = None)]
#[command(author = "Patient Contracts Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "patient-contracts.toml",
        env = "PATIENT_CONTRACTS_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PATIENT_CONTRACTS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a JSON payload against one contract
    Check(commands::check::CheckArgs),

    /// Validate a bulk import file and plan it against existing patients
    Import(commands::import::ImportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
