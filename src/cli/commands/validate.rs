//! Validate config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            return Ok(2);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Implicit Primary: {:?}",
            config.validation.implicit_primary
        );
        println!(
            "  Consent Revocation: {:?}",
            config.validation.consent_revocation
        );
        println!("  Max Import Batch: {}", config.import.max_batch_size);
        println!("  Import Concurrency: {}", config.import.concurrency);
        if config.audit.enabled {
            println!("  Audit Log: {}", config.audit.log_path);
        } else {
            println!("  Audit Log: disabled");
        }
        if config.logging.local_enabled {
            println!(
                "  File Logging: {} ({})",
                config.logging.local_path, config.logging.local_rotation
            );
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let code = ValidateArgs {}
            .execute("/nonexistent/patient-contracts.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[import]\nconcurrency = 8").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), 0);
    }
}
