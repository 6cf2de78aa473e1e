//! Configuration management
//!
//! The crate reads a single TOML file, `patient-contracts.toml`, with support
//! for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PATIENT_CONTRACTS_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`ValidationConfig`] - implicit-primary and consent-revocation policies
//! - [`ImportConfig`] - bulk import batch size and worker count
//! - [`AuditConfig`] - audit trail location
//! - [`LoggingConfig`] - optional JSON file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [validation]
//! implicit_primary = "preserve"
//! consent_revocation = "warn"
//!
//! [import]
//! max_batch_size = 1000
//! concurrency = 4
//!
//! [audit]
//! enabled = true
//! log_path = "${AUDIT_DIR}/patient-contracts.jsonl"
//! ```
//!
//! ```rust,no_run
//! use patient_contracts::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("patient-contracts.toml")?;
//! println!("Max batch: {}", config.import.max_batch_size);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_or_default, parse_config};
pub use schema::{
    ApplicationConfig, AuditConfig, ContractsConfig, ImportConfig, LoggingConfig, ValidationConfig,
};
