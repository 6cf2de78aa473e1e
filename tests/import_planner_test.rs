//! Integration tests for bulk import planning and application
//!
//! Each test seeds a `MemoryPatientStore` with one stored patient and runs a
//! two-element import against it: one new person and one that matches the
//! stored record by name and date of birth.

use patient_contracts::adapters::{MemoryPatientStore, PatientStore};
use patient_contracts::core::import::{plan, run_import, validate_concurrently, ImportDecision};
use patient_contracts::core::lifecycle::apply_archive;
use patient_contracts::domain::{PatientId, TenantId};
use patient_contracts::dto::ImportMode;
use patient_contracts::schema::Patient;
use patient_contracts::Validator;
use serde_json::{json, Value};
use std::str::FromStr;
use test_case::test_case;

const TENANT: &str = "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11";
const STORED_ID: &str = "7d44b88c-4199-4bad-97dc-d78268e01398";

fn stored_patient() -> Patient {
    Validator::default()
        .validate_patient(&json!({
            "id": STORED_ID,
            "tenantId": TENANT,
            "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
            "patientNumber": "P-000007",
            "name": {"firstName": "Ada", "lastName": "Lovelace"},
            "demographics": {"dateOfBirth": "1985-12-10", "gender": "female"},
            "createdAt": "2024-01-01T00:00:00Z",
            "createdBy": "system",
            "updatedAt": "2024-01-02T00:00:00Z",
            "updatedBy": "system"
        }))
        .unwrap()
}

fn element(first: &str, last: &str, dob: &str) -> Value {
    json!({
        "tenantId": TENANT,
        "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
        "name": {"firstName": first, "lastName": last},
        "demographics": {"dateOfBirth": dob, "gender": "female"},
        "notes": "imported from legacy system"
    })
}

fn request(flags: Value) -> Value {
    let mut raw = json!({
        "source": "legacy",
        "patients": [
            element("Grace", "Hopper", "1976-12-09"),
            element("ada", "LOVELACE", "1985-12-10")
        ]
    });
    if let (Some(raw), Some(flags)) = (raw.as_object_mut(), flags.as_object()) {
        raw.extend(flags.clone());
    }
    raw
}

async fn seeded_store() -> MemoryPatientStore {
    MemoryPatientStore::seeded([stored_patient()]).await.unwrap()
}

fn stored_id() -> PatientId {
    PatientId::from_str(STORED_ID).unwrap()
}

fn tenant() -> TenantId {
    TenantId::from_str(TENANT).unwrap()
}

#[tokio::test]
async fn test_concurrent_validation_matches_sequential() {
    let validator = Validator::default();
    let mut raw = request(json!({}));
    raw["patients"]
        .as_array_mut()
        .unwrap()
        .push(json!({"name": "not an object"}));

    let sequential = validator.validate_bulk_import(&raw).unwrap();
    for workers in [1, 2, 8] {
        let concurrent = validate_concurrently(&validator, &raw, workers).await.unwrap();
        assert_eq!(concurrent, sequential);
    }
    assert_eq!(sequential.failures[0].index, 2);
}

#[tokio::test]
async fn test_invalid_envelope_is_an_error() {
    let result = validate_concurrently(&Validator::default(), &json!({"patients": []}), 4).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_plan_skips_duplicates_by_default() {
    let store = seeded_store().await;
    let import = Validator::default()
        .validate_bulk_import(&request(json!({})))
        .unwrap();

    let planned = plan(&store, &import).await.unwrap();
    assert_eq!(planned[0].decision, ImportDecision::Create);
    assert_eq!(
        planned[1].decision,
        ImportDecision::Skip {
            existing: stored_id()
        }
    );
}

#[tokio::test]
async fn test_update_existing_wins_over_skip() {
    let store = seeded_store().await;
    let import = Validator::default()
        .validate_bulk_import(&request(
            json!({"skipDuplicates": true, "updateExisting": true}),
        ))
        .unwrap();

    let planned = plan(&store, &import).await.unwrap();
    assert_eq!(
        planned[1].decision,
        ImportDecision::Update {
            existing: stored_id()
        }
    );
}

#[tokio::test]
async fn test_duplicates_conflict_without_policy() {
    let store = seeded_store().await;
    let import = Validator::default()
        .validate_bulk_import(&request(json!({"skipDuplicates": false})))
        .unwrap();

    let planned = plan(&store, &import).await.unwrap();
    assert_eq!(
        planned[1].decision,
        ImportDecision::Conflict {
            existing: stored_id()
        }
    );
}

#[test_case(json!({}) ; "skip policy")]
#[test_case(json!({"updateExisting": true}) ; "update policy")]
#[tokio::test]
async fn test_archived_match_is_always_a_conflict(flags: Value) {
    let validator = Validator::default();
    let stored = stored_patient();
    let archive = validator
        .validate_archive(&json!({
            "patientId": STORED_ID,
            "reason": "Duplicate registration",
            "performedBy": "front-desk"
        }))
        .unwrap();
    let archived = apply_archive(&validator, &stored, &archive).unwrap();
    let store = MemoryPatientStore::seeded([archived]).await.unwrap();

    let import = validator.validate_bulk_import(&request(flags)).unwrap();
    let planned = plan(&store, &import).await.unwrap();
    assert_eq!(planned[0].decision, ImportDecision::Create);
    assert_eq!(
        planned[1].decision,
        ImportDecision::Conflict {
            existing: stored_id()
        }
    );
}

#[tokio::test]
async fn test_validate_only_does_not_plan() {
    let validator = Validator::default();
    let store = seeded_store().await;
    let import = validator
        .validate_bulk_import(&request(json!({"validateOnly": true, "dryRun": true})))
        .unwrap();

    let summary = run_import(&validator, &store, import, "importer").await.unwrap();
    assert_eq!(summary.mode, ImportMode::ValidateOnly);
    assert_eq!(summary.total, 2);
    assert!(summary.plan.is_empty());
    assert!(!summary.applied);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_dry_run_counts_without_writing() {
    let validator = Validator::default();
    let store = seeded_store().await;
    let import = validator
        .validate_bulk_import(&request(json!({"dryRun": true})))
        .unwrap();

    let summary = run_import(&validator, &store, import, "importer").await.unwrap();
    assert_eq!(summary.mode, ImportMode::DryRun);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.plan.len(), 2);
    assert!(!summary.applied);
    assert!(summary.is_clean());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_apply_creates_with_allocated_number() {
    let validator = Validator::default();
    let store = seeded_store().await;
    let import = validator
        .validate_bulk_import(&request(json!({})))
        .unwrap();

    let summary = run_import(&validator, &store, import, "importer").await.unwrap();
    assert!(summary.applied);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);

    let patients = store.list(tenant()).await;
    assert_eq!(patients.len(), 2);
    let created = patients
        .iter()
        .find(|p| p.record.name.last_name == "Hopper")
        .unwrap();
    assert_eq!(created.patient_number, "P-000008");
    assert_eq!(created.version, 0);
    assert_eq!(created.audit.created_by, "importer");
}

#[tokio::test]
async fn test_apply_updates_existing_record() {
    let validator = Validator::default();
    let store = seeded_store().await;
    let import = validator
        .validate_bulk_import(&request(json!({"updateExisting": true})))
        .unwrap();

    let summary = run_import(&validator, &store, import, "importer").await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 1);

    let updated = store.get(tenant(), stored_id()).await.unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.patient_number, "P-000007");
    assert_eq!(
        updated.record.notes.as_deref(),
        Some("imported from legacy system")
    );
    assert_eq!(updated.audit.updated_by, "importer");
}

#[tokio::test]
async fn test_invalid_elements_reported_with_plan() {
    let validator = Validator::default();
    let store = MemoryPatientStore::new();
    let mut raw = request(json!({"dryRun": true}));
    raw["patients"][1]["demographics"]["dateOfBirth"] = json!("1985-13-40");

    let import = validator.validate_bulk_import(&raw).unwrap();
    let summary = run_import(&validator, &store, import, "importer").await.unwrap();
    assert_eq!(summary.invalid, 1);
    assert_eq!(summary.created, 1);
    assert!(!summary.is_clean());
    assert_eq!(summary.failures[0].index, 1);

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["mode"], "dry_run");
    assert_eq!(value["plan"][0]["decision"], "create");
}
