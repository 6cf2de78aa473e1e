//! Canonical patient entity
//!
//! Every key of the root record is listed once in [`PATIENT_FIELDS`] with its
//! canonical presence. The parser for each key is registered once in
//! [`read_field`]. The canonical record, the create projection and the update
//! projection all read through these two tables and differ only in the
//! [`Shape`] they pass and in how the raw fields are assembled.

use super::collections::{dedupe, enforce_single_primary};
use super::consent::{consents, ConsentRecord};
use super::contact::{emergency_contacts, EmergencyContact, PatientContacts};
use super::context::ValidationContext;
use super::enums::PatientStatus;
use super::fields::Fields;
use super::insurance::PatientInsurance;
use super::medical::MedicalFlags;
use super::node::{defaulted, parse, refine, Refinement};
use super::preferences::CommunicationPreferences;
use super::primitives::{
    datetime, enum_value, id, list, object, text, unsigned, Pattern, Text, ACTOR,
};
use super::shape::{FieldSpec, Presence, Shape};
use super::values::{Demographics, PersonName};
use crate::domain::{
    ClinicId, FieldPath, OrganizationId, PatientId, ProviderId, TenantId, ViolationCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const PATIENT_NUMBER: Text = Text::new(1, 30).pattern(Pattern::PatientNumber);
const TAG: Text = Text::new(1, 50);
pub(crate) const MAX_TAGS: usize = 50;
const REFERRAL_SOURCE: Text = Text::new(1, 200);
const PATIENT_NOTES: Text = Text::new(0, 5000);

/// Every key of the canonical patient record
pub const PATIENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::server("id"),
    FieldSpec::required("tenantId"),
    FieldSpec::required("organizationId"),
    FieldSpec::optional("clinicId"),
    FieldSpec::required("patientNumber"),
    FieldSpec::required("name"),
    FieldSpec::required("demographics"),
    FieldSpec::defaulted("contacts"),
    FieldSpec::defaulted("emergencyContacts"),
    FieldSpec::optional("insurance"),
    FieldSpec::optional("medical"),
    FieldSpec::defaulted("communicationPreferences"),
    FieldSpec::defaulted("consents"),
    FieldSpec::defaulted("status"),
    FieldSpec::optional("assignedProviderId"),
    FieldSpec::optional("referralSource"),
    FieldSpec::defaulted("tags"),
    FieldSpec::optional("notes"),
    FieldSpec::defaulted("metadata"),
    FieldSpec::server("createdAt"),
    FieldSpec::server("createdBy"),
    FieldSpec::server("updatedAt"),
    FieldSpec::server("updatedBy"),
    FieldSpec::optional("deletedAt").assigned(),
    FieldSpec::optional("deletedBy").assigned(),
    FieldSpec::defaulted("version").assigned(),
];

/// The canonical record
pub static CANONICAL_SHAPE: LazyLock<Shape> = LazyLock::new(|| Shape::new(PATIENT_FIELDS));

/// Create: no server-assigned keys; the store may generate `patientNumber`
pub static CREATE_SHAPE: LazyLock<Shape> = LazyLock::new(|| {
    CANONICAL_SHAPE
        .clone()
        .without_server_assigned()
        .optional(&["patientNumber"])
});

/// Update: a shallow patch of the create keys plus the concurrency token
pub static UPDATE_SHAPE: LazyLock<Shape> = LazyLock::new(|| {
    CREATE_SHAPE
        .clone()
        .omit(&["tenantId"])
        .partial()
        .extend(&[FieldSpec::required("version")])
        .nullable(&["assignedProviderId"])
});

/// True if `name` is a key of the canonical record
pub fn is_patient_field(name: &str) -> bool {
    CANONICAL_SHAPE.contains(name)
}

/// The client-editable body shared by the canonical record and the create DTO
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub name: PersonName,
    pub demographics: Demographics,
    pub contacts: PatientContacts,
    pub emergency_contacts: Vec<EmergencyContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<PatientInsurance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical: Option<MedicalFlags>,
    pub communication_preferences: CommunicationPreferences,
    pub consents: Vec<ConsentRecord>,
    pub status: PatientStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_provider_id: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_source: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Store-owned audit columns
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
}

/// The canonical, fully normalized patient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub tenant_id: TenantId,
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<ClinicId>,
    pub patient_number: String,
    #[serde(flatten)]
    pub record: PatientRecord,
    #[serde(flatten)]
    pub audit: AuditStamp,
    pub version: u64,
}

impl Patient {
    pub fn is_deleted(&self) -> bool {
        self.audit.deleted_at.is_some()
    }

    pub fn display_name(&self) -> String {
        self.record.name.display_name()
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.record.demographics.date_of_birth
    }
}

/// Every root key as read, before defaults
#[derive(Default)]
pub(crate) struct PatientRaw {
    pub id: Option<PatientId>,
    pub tenant_id: Option<TenantId>,
    pub organization_id: Option<OrganizationId>,
    pub clinic_id: Option<ClinicId>,
    pub patient_number: Option<String>,
    pub name: Option<PersonName>,
    pub demographics: Option<Demographics>,
    pub contacts: Option<PatientContacts>,
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
    pub insurance: Option<PatientInsurance>,
    pub medical: Option<MedicalFlags>,
    pub communication_preferences: Option<CommunicationPreferences>,
    pub consents: Option<Vec<ConsentRecord>>,
    pub status: Option<PatientStatus>,
    pub assigned_provider_id: Option<ProviderId>,
    pub referral_source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub version: Option<u64>,
    /// Nullable keys supplied as explicit `null`
    pub cleared: Vec<&'static str>,
}

impl PatientRaw {
    pub fn is_cleared(&self, name: &str) -> bool {
        self.cleared.contains(&name)
    }
}

fn take<T>(
    fields: &Fields<'_>,
    spec: &FieldSpec,
    cx: &mut ValidationContext,
    parse: impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
) -> Option<T> {
    match spec.presence {
        Presence::Required => fields.required(cx, spec.name, parse),
        Presence::Defaulted | Presence::Optional => fields.optional(cx, spec.name, parse),
    }
}

/// Parses one root key into `raw` according to `spec`
fn read_field(raw: &mut PatientRaw, spec: &FieldSpec, fields: &Fields<'_>, cx: &mut ValidationContext) {
    if spec.nullable && fields.is_null(spec.name) {
        raw.cleared.push(spec.name);
        return;
    }

    match spec.name {
        "id" => raw.id = take(fields, spec, cx, id::<PatientId>),
        "tenantId" => raw.tenant_id = take(fields, spec, cx, id::<TenantId>),
        "organizationId" => raw.organization_id = take(fields, spec, cx, id::<OrganizationId>),
        "clinicId" => raw.clinic_id = take(fields, spec, cx, id::<ClinicId>),
        "patientNumber" => raw.patient_number = take(fields, spec, cx, text(PATIENT_NUMBER)),
        "name" => raw.name = take(fields, spec, cx, parse::<PersonName>),
        "demographics" => raw.demographics = take(fields, spec, cx, parse::<Demographics>),
        "contacts" => raw.contacts = take(fields, spec, cx, parse::<PatientContacts>),
        "emergencyContacts" => {
            raw.emergency_contacts = take(fields, spec, cx, emergency_contacts)
        }
        "insurance" => raw.insurance = take(fields, spec, cx, parse::<PatientInsurance>),
        "medical" => raw.medical = take(fields, spec, cx, parse::<MedicalFlags>),
        "communicationPreferences" => {
            raw.communication_preferences =
                take(fields, spec, cx, parse::<CommunicationPreferences>)
        }
        "consents" => raw.consents = take(fields, spec, cx, consents),
        "status" => raw.status = take(fields, spec, cx, enum_value::<PatientStatus>),
        "assignedProviderId" => {
            raw.assigned_provider_id = take(fields, spec, cx, id::<ProviderId>)
        }
        "referralSource" => raw.referral_source = take(fields, spec, cx, text(REFERRAL_SOURCE)),
        "tags" => raw.tags = take(fields, spec, cx, list(text(TAG), 0, MAX_TAGS)),
        "notes" => raw.notes = take(fields, spec, cx, text(PATIENT_NOTES)),
        "metadata" => raw.metadata = take(fields, spec, cx, object),
        "createdAt" => raw.created_at = take(fields, spec, cx, datetime),
        "createdBy" => raw.created_by = take(fields, spec, cx, text(ACTOR)),
        "updatedAt" => raw.updated_at = take(fields, spec, cx, datetime),
        "updatedBy" => raw.updated_by = take(fields, spec, cx, text(ACTOR)),
        "deletedAt" => raw.deleted_at = take(fields, spec, cx, datetime),
        "deletedBy" => raw.deleted_by = take(fields, spec, cx, text(ACTOR)),
        "version" => raw.version = take(fields, spec, cx, unsigned(0, i64::MAX as u64)),
        other => unreachable!("no parser registered for patient field '{other}'"),
    }
}

/// Reads every key of `shape` from `value`
///
/// Returns `None` when the value is not an object or any key failed.
pub(crate) fn read_patient(
    value: &Value,
    path: &FieldPath,
    shape: &Shape,
    cx: &mut ValidationContext,
) -> Option<PatientRaw> {
    let before = cx.error_count();
    let fields = Fields::open(value, path, &shape.keys(), cx)?;
    let mut raw = PatientRaw::default();
    for spec in shape.fields() {
        read_field(&mut raw, spec, &fields, cx);
    }
    (cx.error_count() == before).then_some(raw)
}

impl PatientRecord {
    /// Moves the body fields out of `raw`, injecting defaults
    pub(crate) fn assemble(
        raw: &mut PatientRaw,
        path: &FieldPath,
        cx: &mut ValidationContext,
    ) -> Option<Self> {
        let contacts = match raw.contacts.take() {
            Some(contacts) => contacts,
            None => defaulted::<PatientContacts>(&path.key("contacts"), cx)?,
        };
        let communication_preferences = match raw.communication_preferences.take() {
            Some(prefs) => prefs,
            None => {
                defaulted::<CommunicationPreferences>(&path.key("communicationPreferences"), cx)?
            }
        };

        Some(Self {
            name: raw.name.take()?,
            demographics: raw.demographics.take()?,
            contacts,
            emergency_contacts: raw.emergency_contacts.take().unwrap_or_default(),
            insurance: raw.insurance.take(),
            medical: raw.medical.take(),
            communication_preferences,
            consents: raw.consents.take().unwrap_or_default(),
            status: raw.status.take().unwrap_or_default(),
            assigned_provider_id: raw.assigned_provider_id.take(),
            referral_source: raw.referral_source.take(),
            tags: raw.tags.take().unwrap_or_default(),
            notes: raw.notes.take(),
            metadata: raw.metadata.take().unwrap_or_default(),
        })
    }
}

pub(crate) fn single_primary_emergency_contact(
    contacts: &mut [EmergencyContact],
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    enforce_single_primary(contacts, &path.key("emergencyContacts"), cx);
}

fn emergency_contact_primary(
    record: &mut PatientRecord,
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    single_primary_emergency_contact(&mut record.emergency_contacts, path, cx);
}

fn unique_tags(record: &mut PatientRecord, _: &FieldPath, _: &mut ValidationContext) {
    dedupe(&mut record.tags);
}

/// Rules over the record body, shared by the canonical record and create
pub(crate) const RECORD_REFINEMENTS: &[Refinement<PatientRecord>] =
    &[emergency_contact_primary, unique_tags];

fn record_rules(patient: &mut Patient, path: &FieldPath, cx: &mut ValidationContext) {
    for rule in RECORD_REFINEMENTS {
        rule(&mut patient.record, path, cx);
    }
}

fn audit_ordering(patient: &mut Patient, path: &FieldPath, cx: &mut ValidationContext) {
    if patient.audit.updated_at < patient.audit.created_at {
        cx.report(
            &path.key("updatedAt"),
            ViolationCode::DateOrdering,
            "updatedAt must not be before createdAt",
        );
    }
}

fn deletion_pair(patient: &mut Patient, path: &FieldPath, cx: &mut ValidationContext) {
    match (patient.audit.deleted_at, &patient.audit.deleted_by) {
        (Some(_), None) => cx.report(
            &path.key("deletedBy"),
            ViolationCode::IncompleteDeletion,
            "deletedBy is required when deletedAt is set",
        ),
        (None, Some(_)) => cx.report(
            &path.key("deletedAt"),
            ViolationCode::IncompleteDeletion,
            "deletedAt is required when deletedBy is set",
        ),
        (Some(deleted_at), Some(_)) if deleted_at < patient.audit.created_at => cx.report(
            &path.key("deletedAt"),
            ViolationCode::DateOrdering,
            "deletedAt must not be before createdAt",
        ),
        _ => {}
    }
}

const PATIENT_REFINEMENTS: &[Refinement<Patient>] = &[record_rules, audit_ordering, deletion_pair];

/// Parses and normalizes a canonical patient record
pub fn normalize_patient(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<Patient> {
    let mut raw = read_patient(value, path, &CANONICAL_SHAPE, cx)?;
    let record = PatientRecord::assemble(&mut raw, path, cx)?;

    let patient = Patient {
        id: raw.id?,
        tenant_id: raw.tenant_id?,
        organization_id: raw.organization_id?,
        clinic_id: raw.clinic_id,
        patient_number: raw.patient_number?,
        record,
        audit: AuditStamp {
            created_at: raw.created_at?,
            created_by: raw.created_by?,
            updated_at: raw.updated_at?,
            updated_by: raw.updated_by?,
            deleted_at: raw.deleted_at,
            deleted_by: raw.deleted_by,
        },
        version: raw.version.unwrap_or(0),
    };
    refine(patient, PATIENT_REFINEMENTS, path, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViolationKind;
    use crate::schema::context::ValidationOptions;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn cx() -> ValidationContext {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        ValidationContext::new(ValidationOptions::default(), now)
    }

    fn minimal() -> Value {
        json!({
            "id": "7d44b88c-4199-4bad-97dc-d78268e01398",
            "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
            "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
            "patientNumber": "P-0001",
            "name": {"firstName": "Ada", "lastName": "Lovelace"},
            "demographics": {"dateOfBirth": "1985-12-10", "gender": "female"},
            "createdAt": "2024-01-01T00:00:00Z",
            "createdBy": "system",
            "updatedAt": "2024-01-02T00:00:00Z",
            "updatedBy": "system"
        })
    }

    #[test]
    fn test_minimal_patient_gets_defaults() {
        let mut cx = cx();
        let patient = normalize_patient(&minimal(), &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(patient.version, 0);
        assert_eq!(patient.record.status, PatientStatus::Active);
        assert!(patient.record.tags.is_empty());
        assert!(patient.record.contacts.phones.is_empty());
        assert!(patient.record.communication_preferences.appointment_reminders);
        assert!(!patient.is_deleted());
        assert_eq!(patient.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_serialized_keys_are_canonical_keys() {
        let mut value = minimal();
        value["clinicId"] = json!("84d7c3f5-1f6a-4f87-aa95-5d9c6b8f3a29");
        value["insurance"] = json!({});
        value["medical"] = json!({});
        value["assignedProviderId"] = json!("1f0e2d3c-4b5a-4697-8877-665544332211");
        value["referralSource"] = json!("web");
        value["notes"] = json!("n");
        value["deletedAt"] = json!("2024-01-03T00:00:00Z");
        value["deletedBy"] = json!("admin");

        let mut cx = cx();
        let patient = normalize_patient(&value, &FieldPath::root(), &mut cx).unwrap();
        let serialized = serde_json::to_value(&patient).unwrap();
        let keys: BTreeSet<&str> = serialized
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let expected: BTreeSet<&str> = CANONICAL_SHAPE.keys().into_iter().collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_sibling_subtrees_all_reported() {
        let mut value = minimal();
        value["name"] = json!({"firstName": ""});
        value["demographics"]["gender"] = json!("x");
        value["tags"] = json!(["ok", ""]);
        value["surprise"] = json!(true);

        let mut cx = cx();
        assert!(normalize_patient(&value, &FieldPath::root(), &mut cx).is_none());
        let errors = cx.into_errors();
        assert_eq!(errors.at("name.firstName").count(), 1);
        assert_eq!(errors.at("name.lastName").count(), 1);
        assert_eq!(errors.at("demographics.gender").count(), 1);
        assert_eq!(errors.at("tags[1]").count(), 1);
        assert_eq!(
            errors.at("surprise").next().unwrap().kind,
            ViolationKind::Structural
        );
    }

    #[test]
    fn test_deletion_pair() {
        let mut value = minimal();
        value["deletedAt"] = json!("2024-01-03T00:00:00Z");
        let mut cx = cx();
        assert!(normalize_patient(&value, &FieldPath::root(), &mut cx).is_none());
        assert_eq!(
            cx.into_errors().at("deletedBy").next().unwrap().code,
            ViolationCode::IncompleteDeletion
        );
    }

    #[test]
    fn test_updated_before_created() {
        let mut value = minimal();
        value["updatedAt"] = json!("2023-01-01T00:00:00Z");
        let mut cx = cx();
        assert!(normalize_patient(&value, &FieldPath::root(), &mut cx).is_none());
        assert!(cx.into_errors().has_code(ViolationCode::DateOrdering));
    }

    #[test]
    fn test_tags_deduplicated() {
        let mut value = minimal();
        value["tags"] = json!(["vip", "diabetic", "vip"]);
        let mut cx = cx();
        let patient = normalize_patient(&value, &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(patient.record.tags, vec!["vip", "diabetic"]);
    }

    #[test]
    fn test_emergency_contacts_single_primary() {
        let mut value = minimal();
        value["emergencyContacts"] = json!([
            {"name": "Bob", "relationship": "brother", "phoneNumber": "5551234567", "isPrimary": true},
            {"name": "Eve", "relationship": "friend", "phoneNumber": "5557654321", "isPrimary": true}
        ]);
        let mut cx = cx();
        assert!(normalize_patient(&value, &FieldPath::root(), &mut cx).is_none());
        assert_eq!(
            cx.into_errors().at("emergencyContacts").next().unwrap().code,
            ViolationCode::DuplicatePrimary
        );
    }

    #[test]
    fn test_projection_shapes() {
        assert!(!CREATE_SHAPE.contains("id"));
        assert!(!CREATE_SHAPE.contains("version"));
        assert!(!CREATE_SHAPE.contains("createdAt"));
        assert_eq!(
            CREATE_SHAPE.get("patientNumber").unwrap().presence,
            Presence::Optional
        );
        assert_eq!(CREATE_SHAPE.get("name").unwrap().presence, Presence::Required);

        assert!(!UPDATE_SHAPE.contains("tenantId"));
        assert_eq!(UPDATE_SHAPE.get("version").unwrap().presence, Presence::Required);
        assert_eq!(UPDATE_SHAPE.get("name").unwrap().presence, Presence::Optional);
        assert!(UPDATE_SHAPE.get("assignedProviderId").unwrap().nullable);
        assert!(is_patient_field("demographics"));
        assert!(!is_patient_field("password"));
    }
}
