//! Integration tests for logging functionality
//!
//! A process can install only one global subscriber, so everything that
//! needs an initialized logger lives in a single test.

use patient_contracts::adapters::MemoryPatientStore;
use patient_contracts::config::LoggingConfig;
use patient_contracts::core::import::run_import;
use patient_contracts::logging::init_logging;
use patient_contracts::Validator;
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected() {
    let result = init_logging("verbose", &LoggingConfig::default());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_json_file_layer_carries_no_field_values() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        local_enabled: true,
        local_path: dir.path().join("logs").to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    let guard = init_logging("debug", &config).unwrap();

    let validator = Validator::default();
    let rejected = validator.validate_create(&json!({
        "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
        "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
        "name": {"firstName": "Ada", "lastName": "Lovelace"},
        "demographics": {"dateOfBirth": "1985-12-10", "gender": "female", "ssn": "12-3456"}
    }));
    assert!(rejected.is_err());

    let import = validator
        .validate_bulk_import(&json!({
            "source": "json",
            "dryRun": true,
            "patients": [{
                "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
                "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
                "name": {"firstName": "Grace", "lastName": "Hopper"},
                "demographics": {"dateOfBirth": "1976-12-09", "gender": "female"}
            }]
        }))
        .unwrap();
    run_import(&validator, &MemoryPatientStore::new(), import, "importer")
        .await
        .unwrap();

    drop(guard);

    let contents =
        std::fs::read_to_string(dir.path().join("logs").join("patient-contracts.log")).unwrap();
    let events: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let summary = events
        .iter()
        .find(|e| e["fields"]["message"] == "Import completed")
        .unwrap();
    assert_eq!(summary["fields"]["created"], 1);
    assert_eq!(summary["level"], "INFO");

    assert!(events
        .iter()
        .any(|e| e["fields"]["message"] == "Validation failed"));
    assert!(!contents.contains("Lovelace"));
    assert!(!contents.contains("12-3456"));
}
