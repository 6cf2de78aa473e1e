// Patient Contracts - Patient record validation and normalization
// Copyright (c) 2025 Patient Contracts Contributors
// Licensed under the MIT License

use patient_contracts::cli::{Cli, Commands};
use patient_contracts::config::LoggingConfig;
use patient_contracts::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Optional; a missing .env is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console only; stdout carries the JSON results
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let _guard = match init_logging(log_level, &LoggingConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Patient Contracts");

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5
        }
    };

    process::exit(exit_code);
}

async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Check(args) => args.execute(&cli.config).await,
        Commands::Import(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
