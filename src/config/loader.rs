//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ContractsConfig;
use crate::domain::errors::ContractError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into [`ContractsConfig`]
/// 4. Applies environment variable overrides (PATIENT_CONTRACTS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ContractError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, the TOML is malformed, or a
/// value fails validation.
///
/// # Examples
///
/// ```no_run
/// use patient_contracts::config::load_config;
///
/// let config = load_config("patient-contracts.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ContractsConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ContractError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ContractError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Like [`load_config`], but a missing file yields the defaults
///
/// Environment overrides still apply to the defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<ContractsConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "No configuration file, using defaults");
        parse_config("")
    }
}

/// Parses configuration text, applying substitutions, overrides and validation
pub fn parse_config(contents: &str) -> Result<ContractsConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ContractsConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ContractError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left alone.
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in ENV_PLACEHOLDER.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ContractError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            ContractError::Configuration(format!("Invalid value for {name}: '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

fn parse_env_enum<T: serde::de::DeserializeOwned>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => serde_json::from_value(serde_json::Value::String(val.trim().to_string()))
            .map(Some)
            .map_err(|_| ContractError::Configuration(format!("Invalid value for {name}: '{val}'"))),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the PATIENT_CONTRACTS_* prefix
///
/// Variables follow the pattern `PATIENT_CONTRACTS_<SECTION>_<KEY>`, for
/// example `PATIENT_CONTRACTS_IMPORT_MAX_BATCH_SIZE`.
fn apply_env_overrides(config: &mut ContractsConfig) -> Result<()> {
    if let Ok(val) = std::env::var("PATIENT_CONTRACTS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Some(policy) = parse_env_enum("PATIENT_CONTRACTS_VALIDATION_IMPLICIT_PRIMARY")? {
        config.validation.implicit_primary = policy;
    }
    if let Some(policy) = parse_env_enum("PATIENT_CONTRACTS_VALIDATION_CONSENT_REVOCATION")? {
        config.validation.consent_revocation = policy;
    }

    if let Some(size) = parse_env("PATIENT_CONTRACTS_IMPORT_MAX_BATCH_SIZE")? {
        config.import.max_batch_size = size;
    }
    if let Some(concurrency) = parse_env("PATIENT_CONTRACTS_IMPORT_CONCURRENCY")? {
        config.import.concurrency = concurrency;
    }

    if let Some(enabled) = parse_env("PATIENT_CONTRACTS_AUDIT_ENABLED")? {
        config.audit.enabled = enabled;
    }
    if let Ok(val) = std::env::var("PATIENT_CONTRACTS_AUDIT_LOG_PATH") {
        config.audit.log_path = val;
    }

    if let Some(enabled) = parse_env("PATIENT_CONTRACTS_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("PATIENT_CONTRACTS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("PATIENT_CONTRACTS_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PC_LOADER_TEST_VAR", "audit/custom.jsonl");
        let input = "log_path = \"${PC_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "log_path = \"audit/custom.jsonl\"\n");
        std::env::remove_var("PC_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("PC_LOADER_MISSING_VAR");
        let input = "log_path = \"${PC_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("PC_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_comment_lines_not_substituted() {
        std::env::remove_var("PC_LOADER_COMMENTED");
        let input = "# log_path = \"${PC_LOADER_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-patient-contracts.toml");
        assert!(matches!(result, Err(ContractError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[validation]
implicit_primary = "promote_first"

[import]
max_batch_size = 250
concurrency = 2

[audit]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.import.max_batch_size, 250);
        assert_eq!(config.import.concurrency, 2);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_or_default("nonexistent-patient-contracts.toml").unwrap();
        assert_eq!(config.import.max_batch_size, 1000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[import]\nconcurrency = 0\n").unwrap_err();
        assert!(err.to_string().contains("import.concurrency"));
    }
}
