//! Init command implementation
//!
//! Writes a starter `patient-contracts.toml`.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "patient-contracts.toml")]
    pub output: String,

    /// Include every option with an explanation
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let contents = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, contents) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Adjust the policies in [validation] if needed");
                println!("  2. Point [audit] log_path at durable storage");
                println!(
                    "  3. Validate it: patient-contracts --config {} validate-config",
                    self.output
                );
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> String {
        r#"# Patient Contracts configuration

[application]
log_level = "info"

[validation]
implicit_primary = "preserve"
consent_revocation = "warn"

[import]
max_batch_size = 1000
concurrency = 4

[audit]
enabled = true
log_path = "audit/patient-contracts.jsonl"

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    fn generate_config_with_examples() -> String {
        r#"# Patient Contracts configuration
#
# Every key is optional. Values may reference environment variables as
# ${VAR_NAME}, and PATIENT_CONTRACTS_<SECTION>_<KEY> overrides any key,
# e.g. PATIENT_CONTRACTS_IMPORT_CONCURRENCY=8.

# ============================================================================
# Application
# ============================================================================
[application]
# trace | debug | info | warn | error
log_level = "info"

# ============================================================================
# Normalization policies
# ============================================================================
[validation]
# What to do when a contact list has no primary entry:
#   preserve      - keep the flags as supplied
#   promote_first - mark the first entry primary
implicit_primary = "preserve"

# A consent with granted = false but no revokedAt/revokedBy:
#   ignore  - accept silently
#   warn    - accept and log a warning
#   enforce - reject the payload
consent_revocation = "warn"

# ============================================================================
# Bulk import
# ============================================================================
[import]
# Maximum patients per request (1-10000)
max_batch_size = 1000

# Parallel validation workers (1-64)
concurrency = 4

# ============================================================================
# Audit trail
# ============================================================================
[audit]
# Records merge, anonymize, archive and restore operations.
# Reasons are stored as SHA-256 digests, never as plain text.
enabled = true
log_path = "${AUDIT_DIR}/patient-contracts.jsonl"

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "logs"

# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}
