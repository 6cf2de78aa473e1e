//! Configuration schema types

use crate::schema::context::{
    ConsentRevocationPolicy, ImplicitPrimaryPolicy, ValidationOptions, DEFAULT_MAX_IMPORT_BATCH,
};
use serde::{Deserialize, Serialize};

/// Root configuration, one field per TOML section
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractsConfig {
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Normalization policies
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Bulk import limits
    #[serde(default)]
    pub import: ImportConfig,

    /// Audit trail for merge, anonymize, archive and restore
    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ContractsConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.import.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Policy options for the validator
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            implicit_primary: self.validation.implicit_primary,
            consent_revocation: self.validation.consent_revocation,
            max_import_batch: self.import.max_batch_size,
        }
    }
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether to mark the first contact primary when none is
    #[serde(default)]
    pub implicit_primary: ImplicitPrimaryPolicy,

    /// How to treat a withheld consent without revocation details
    #[serde(default)]
    pub consent_revocation: ConsentRevocationPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Maximum records per import request (1-10000)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Parallel validation workers (1-64)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl ImportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 || self.max_batch_size > 10_000 {
            return Err(format!(
                "import.max_batch_size must be between 1 and 10000, got {}",
                self.max_batch_size
            ));
        }
        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(format!(
                "import.concurrency must be between 1 and 64, got {}",
                self.concurrency
            ));
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON-lines file audit events are appended to
    #[serde(default = "default_audit_path")]
    pub log_path: String,
}

impl AuditConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.log_path.trim().is_empty() {
            return Err("audit.log_path cannot be empty when audit is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: default_audit_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable the JSON file layer
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation policy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".into());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_IMPORT_BATCH
}

fn default_concurrency() -> usize {
    4
}

fn default_audit_path() -> String {
    "audit/patient-contracts.jsonl".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ContractsConfig = toml::from_str("").unwrap();
        assert_eq!(config, ContractsConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.import.max_batch_size, 1000);
        assert_eq!(config.import.concurrency, 4);
        assert!(config.audit.enabled);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_policies_parse_snake_case() {
        let config: ContractsConfig = toml::from_str(
            r#"
[validation]
implicit_primary = "promote_first"
consent_revocation = "enforce"
"#,
        )
        .unwrap();
        let options = config.validation_options();
        assert_eq!(options.implicit_primary, ImplicitPrimaryPolicy::PromoteFirst);
        assert_eq!(options.consent_revocation, ConsentRevocationPolicy::Enforce);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_import_config_validation() {
        let mut config = ImportConfig::default();
        assert!(config.validate().is_ok());

        config.max_batch_size = 0;
        assert!(config.validate().is_err());

        config.max_batch_size = 10_001;
        assert!(config.validate().is_err());

        config.max_batch_size = 500;
        config.concurrency = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_rotation_validation() {
        let mut config = LoggingConfig::default();
        config.local_rotation = "weekly".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("local_rotation"));
    }

    #[test]
    fn test_batch_size_flows_into_options() {
        let mut config = ContractsConfig::default();
        config.import.max_batch_size = 25;
        assert_eq!(config.validation_options().max_import_batch, 25);
    }
}
