//! Integration tests for the properties every contract must keep
//!
//! These run whole payloads through the public entry points and check the
//! normalized output or the violation list.

use patient_contracts::domain::{ViolationCode, ViolationKind};
use patient_contracts::schema::{ImplicitPrimaryPolicy, ValidationOptions};
use patient_contracts::{validate_anonymize, validate_bulk_import, validate_patient, Validator};
use serde_json::{json, Value};
use test_case::test_case;

fn patient() -> Value {
    json!({
        "id": "7d44b88c-4199-4bad-97dc-d78268e01398",
        "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
        "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
        "patientNumber": "P-000123",
        "name": {"firstName": "  Ada ", "lastName": "Lovelace"},
        "demographics": {"dateOfBirth": "1985-12-10", "gender": "female"},
        "contacts": {
            "phones": [
                {"number": "(555) 123-4567", "isPrimary": true},
                {"type": "work", "number": "555.765.4321"}
            ],
            "emails": [{"email": "ada@example.com"}]
        },
        "communicationPreferences": {"enabledChannels": ["email", "sms", "email"]},
        "tags": ["vip", "vip", "diabetic"],
        "createdAt": "2024-01-01T00:00:00Z",
        "createdBy": "system",
        "updatedAt": "2024-01-02T00:00:00Z",
        "updatedBy": "system"
    })
}

fn create() -> Value {
    json!({
        "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
        "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
        "name": {"firstName": "Grace", "lastName": "Hopper"},
        "demographics": {"dateOfBirth": "1976-12-09", "gender": "female"}
    })
}

#[test]
fn test_normalization_is_idempotent() {
    let once = validate_patient(&patient()).unwrap();
    let reserialized = serde_json::to_value(&once).unwrap();
    let twice = validate_patient(&reserialized).unwrap();

    assert_eq!(once, twice);
    assert_eq!(reserialized, serde_json::to_value(&twice).unwrap());
    assert_eq!(once.record.name.first_name, "Ada");
    assert_eq!(once.record.tags, vec!["vip", "diabetic"]);
}

#[test]
fn test_all_sibling_violations_reported() {
    let mut raw = patient();
    raw["name"]["lastName"] = json!("");
    raw["demographics"]["gender"] = json!("unknown-value");
    raw["contacts"]["emails"][0]["email"] = json!("not-an-email");

    let errors = validate_patient(&raw).unwrap_err();
    assert!(errors.len() >= 3);
    assert_eq!(errors.at("name.lastName").count(), 1);
    assert_eq!(errors.at("demographics.gender").count(), 1);
    assert_eq!(errors.at("contacts.emails[0].email").count(), 1);
}

#[test_case("phones", json!([{"number": "5551234567", "isPrimary": true}, {"number": "5557654321", "isPrimary": true}]) ; "phones")]
#[test_case("emails", json!([{"email": "a@example.com", "isPrimary": true}, {"email": "b@example.com", "isPrimary": true}]) ; "emails")]
#[test_case("addresses", json!([{"line1": "1 Main St", "city": "Springfield", "state": "IL", "postalCode": "62701", "isPrimary": true}, {"line1": "9 Elm St", "city": "Springfield", "state": "IL", "postalCode": "62704", "isPrimary": true}]) ; "addresses")]
fn test_at_most_one_primary(collection: &str, items: Value) {
    let mut raw = patient();
    raw["contacts"][collection] = items;

    let errors = validate_patient(&raw).unwrap_err();
    let path = format!("contacts.{collection}");
    let violation = errors.at(&path).next().unwrap();
    assert_eq!(violation.code, ViolationCode::DuplicatePrimary);
    assert_eq!(violation.kind, ViolationKind::Invariant);
    assert!(violation.message.contains("0, 1"));
}

#[test]
fn test_missing_primary_follows_policy() {
    let mut raw = patient();
    raw["contacts"]["phones"][0]["isPrimary"] = json!(false);

    let preserved = validate_patient(&raw).unwrap();
    assert!(preserved
        .record
        .contacts
        .phones
        .iter()
        .all(|phone| !phone.is_primary));

    let promoting = Validator::new(ValidationOptions {
        implicit_primary: ImplicitPrimaryPolicy::PromoteFirst,
        ..ValidationOptions::default()
    });
    let promoted = promoting.validate_patient(&raw).unwrap();
    assert!(promoted.record.contacts.phones[0].is_primary);
    assert!(!promoted.record.contacts.phones[1].is_primary);
}

#[test_case(json!({"secondary": {"provider": "Acme", "policyNumber": "B-2", "subscriberName": "Ada"}}), "insurance.secondary" ; "secondary without primary")]
#[test_case(json!({
    "primary": {"provider": "Acme", "policyNumber": "A-1", "subscriberName": "Ada"},
    "tertiary": {"provider": "Acme", "policyNumber": "C-3", "subscriberName": "Ada"}
}), "insurance.tertiary" ; "tertiary without secondary")]
fn test_insurance_tiers_fill_in_order(insurance: Value, at: &str) {
    let mut raw = patient();
    raw["insurance"] = insurance;

    let errors = validate_patient(&raw).unwrap_err();
    assert_eq!(
        errors.at(at).next().unwrap().code,
        ViolationCode::InvalidTierOrdering
    );
}

#[test]
fn test_do_not_contact_cascades() {
    let mut raw = patient();
    raw["communicationPreferences"] = json!({
        "doNotContact": true,
        "appointmentReminders": true,
        "marketingMessages": true
    });

    let prefs = validate_patient(&raw).unwrap().record.communication_preferences;
    assert!(prefs.do_not_contact);
    assert!(!prefs.appointment_reminders);
    assert!(!prefs.medication_reminders);
    assert!(!prefs.health_education);
    assert!(!prefs.marketing_messages);
    assert!(!prefs.surveys);
}

#[test]
fn test_query_defaults() {
    let query = Validator::default()
        .validate_query(&json!({"organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2"}))
        .unwrap();
    let value = serde_json::to_value(&query).unwrap();

    assert_eq!(value["page"], 1);
    assert_eq!(value["pageSize"], 20);
    assert_eq!(value["sortBy"], "lastName");
    assert_eq!(value["sortOrder"], "asc");
    assert_eq!(value["includeDeleted"], false);
    assert_eq!(query.offset(), 0);
}

#[test]
fn test_query_accepts_string_spellings() {
    let query = Validator::default()
        .validate_query(&json!({
            "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
            "page": "3",
            "pageSize": "50",
            "includeDeleted": "true",
            "status": "active,inactive"
        }))
        .unwrap();
    assert_eq!(query.page, 3);
    assert_eq!(query.offset(), 100);
    assert!(query.include_deleted);
    assert_eq!(query.status.len(), 2);
}

#[test_case(json!({"notes": "x"}), ViolationKind::Structural ; "missing version")]
#[test_case(json!({"version": "4"}), ViolationKind::Constraint ; "string version")]
#[test_case(json!({"version": -1}), ViolationKind::Constraint ; "negative version")]
fn test_update_requires_version(raw: Value, kind: ViolationKind) {
    let errors = Validator::default().validate_update(&raw).unwrap_err();
    assert_eq!(errors.at("version").next().unwrap().kind, kind);
}

#[test]
fn test_bulk_elements_are_isolated() {
    let mut broken = create();
    broken["demographics"]["dateOfBirth"] = json!("not-a-date");
    let mut second = create();
    second["name"]["firstName"] = json!("Katherine");
    second["name"]["lastName"] = json!("Johnson");

    let raw = json!({"source": "json", "patients": [create(), broken, second]});
    let import = validate_bulk_import(&raw).unwrap();

    assert_eq!(import.total(), 3);
    let accepted: Vec<usize> = import.items.iter().map(|item| item.index).collect();
    assert_eq!(accepted, vec![0, 2]);
    assert_eq!(import.failures.len(), 1);
    assert_eq!(import.failures[0].index, 1);
    assert_eq!(
        import.failures[0]
            .errors
            .at("patients[1].demographics.dateOfBirth")
            .count(),
        1
    );
}

#[test]
fn test_bulk_in_batch_duplicates() {
    let mut again = create();
    again["name"]["firstName"] = json!("GRACE");
    let raw = json!({"source": "csv", "patients": [create(), again]});

    let import = validate_bulk_import(&raw).unwrap();
    assert_eq!(import.items.len(), 1);
    assert_eq!(import.failures[0].index, 1);
    assert!(import.failures[0]
        .errors
        .has_code(ViolationCode::DuplicateEntry));
}

#[test]
fn test_bulk_envelope_rejects_request() {
    let errors = validate_bulk_import(&json!({"source": "xml", "patients": []})).unwrap_err();
    assert_eq!(errors.at("source").count(), 1);
    assert_eq!(
        errors.at("patients").next().unwrap().code,
        ViolationCode::TooFewItems
    );
}

#[test_case(None ; "missing")]
#[test_case(Some(json!(false)) ; "false")]
#[test_case(Some(json!("true")) ; "string")]
#[test_case(Some(json!(1)) ; "number")]
fn test_anonymize_requires_literal_true(confirm: Option<Value>) {
    let mut raw = json!({
        "patientId": "7d44b88c-4199-4bad-97dc-d78268e01398",
        "reason": "",
        "performedBy": "privacy-officer"
    });
    if let Some(confirm) = confirm {
        raw["confirmIrreversible"] = confirm;
    }

    let errors = validate_anonymize(&raw).unwrap_err();
    let guard = errors.at("confirmIrreversible").next().unwrap();
    assert_eq!(guard.code, ViolationCode::ConfirmationRequired);
    assert_eq!(guard.kind, ViolationKind::Guard);
    // reported alongside the other problems
    assert_eq!(errors.at("reason").count(), 1);
}

#[test]
fn test_anonymize_accepts_confirmation() {
    let dto = validate_anonymize(&json!({
        "patientId": "7d44b88c-4199-4bad-97dc-d78268e01398",
        "reason": "Right to erasure request",
        "performedBy": "privacy-officer",
        "confirmIrreversible": true
    }))
    .unwrap();
    assert_eq!(serde_json::to_value(&dto).unwrap()["strategy"], "redact");
}

#[test]
fn test_violations_serialize() {
    let errors = validate_patient(&json!({})).unwrap_err();
    let value = serde_json::to_value(&errors).unwrap();
    let violations = value["violations"].as_array().unwrap();
    assert!(!violations.is_empty());
    assert!(violations
        .iter()
        .all(|v| v["kind"].is_string() && v["code"].is_string() && v["path"].is_string()));
}
