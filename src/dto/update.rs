//! Update projection
//!
//! Every key is optional and absent means "no change"; nothing is defaulted
//! at the top level. A nested object that is supplied replaces the stored one
//! and is validated in full, defaults included. `version` must echo the
//! stored version.

use crate::domain::{ClinicId, FieldPath, OrganizationId, ProviderId};
use crate::schema::collections::dedupe;
use crate::schema::consent::ConsentRecord;
use crate::schema::contact::{EmergencyContact, PatientContacts};
use crate::schema::context::ValidationContext;
use crate::schema::enums::PatientStatus;
use crate::schema::fields::Nullable;
use crate::schema::insurance::PatientInsurance;
use crate::schema::medical::MedicalFlags;
use crate::schema::node::{refine, Refinement};
use crate::schema::patient::{read_patient, single_primary_emergency_contact, UPDATE_SHAPE};
use crate::schema::preferences::CommunicationPreferences;
use crate::schema::values::{Demographics, PersonName};
use serde::Serialize;
use serde_json::{Map, Value};

/// Field changes of an update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<ClinicId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PersonName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demographics: Option<Demographics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<PatientContacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<PatientInsurance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical: Option<MedicalFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_preferences: Option<CommunicationPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consents: Option<Vec<ConsentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    /// `Null` clears the assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_provider_id: Option<Nullable<ProviderId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl PatientPatch {
    /// True if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientDto {
    /// Version the client last read
    pub version: u64,
    #[serde(flatten)]
    pub changes: PatientPatch,
}

fn emergency_contact_primary(
    dto: &mut UpdatePatientDto,
    path: &FieldPath,
    cx: &mut ValidationContext,
) {
    if let Some(contacts) = dto.changes.emergency_contacts.as_mut() {
        single_primary_emergency_contact(contacts, path, cx);
    }
}

fn unique_tags(dto: &mut UpdatePatientDto, _: &FieldPath, _: &mut ValidationContext) {
    if let Some(tags) = dto.changes.tags.as_mut() {
        dedupe(tags);
    }
}

const UPDATE_REFINEMENTS: &[Refinement<UpdatePatientDto>] = &[emergency_contact_primary, unique_tags];

pub fn normalize_update(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<UpdatePatientDto> {
    let raw = read_patient(value, path, &UPDATE_SHAPE, cx)?;

    let assigned_provider_id = if raw.is_cleared("assignedProviderId") {
        Some(Nullable::Null)
    } else {
        raw.assigned_provider_id.map(Nullable::Value)
    };

    let dto = UpdatePatientDto {
        version: raw.version?,
        changes: PatientPatch {
            organization_id: raw.organization_id,
            clinic_id: raw.clinic_id,
            patient_number: raw.patient_number,
            name: raw.name,
            demographics: raw.demographics,
            contacts: raw.contacts,
            emergency_contacts: raw.emergency_contacts,
            insurance: raw.insurance,
            medical: raw.medical,
            communication_preferences: raw.communication_preferences,
            consents: raw.consents,
            status: raw.status,
            assigned_provider_id,
            referral_source: raw.referral_source,
            tags: raw.tags,
            notes: raw.notes,
            metadata: raw.metadata,
        },
    };
    refine(dto, UPDATE_REFINEMENTS, path, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ViolationCode, ViolationKind};
    use crate::schema::context::ValidationOptions;
    use crate::schema::enums::Channel;
    use chrono::Utc;
    use serde_json::json;

    fn cx() -> ValidationContext {
        ValidationContext::new(ValidationOptions::default(), Utc::now())
    }

    #[test]
    fn test_version_only_is_empty_patch() {
        let mut cx = cx();
        let dto = normalize_update(&json!({"version": 4}), &FieldPath::root(), &mut cx).unwrap();
        assert_eq!(dto.version, 4);
        assert!(dto.changes.is_empty());
    }

    #[test]
    fn test_missing_version_is_structural() {
        let mut cx = cx();
        assert!(normalize_update(&json!({"notes": "x"}), &FieldPath::root(), &mut cx).is_none());
        let errors = cx.into_errors();
        let violation = errors.at("version").next().unwrap();
        assert_eq!(violation.kind, ViolationKind::Structural);
    }

    #[test]
    fn test_string_version_is_constraint() {
        let mut cx = cx();
        assert!(normalize_update(&json!({"version": "4"}), &FieldPath::root(), &mut cx).is_none());
        let errors = cx.into_errors();
        let violation = errors.at("version").next().unwrap();
        assert_eq!(violation.kind, ViolationKind::Constraint);
        assert_eq!(violation.code, ViolationCode::InvalidType);
    }

    #[test]
    fn test_null_clears_provider() {
        let mut cx = cx();
        let dto = normalize_update(
            &json!({"version": 1, "assignedProviderId": null}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert_eq!(dto.changes.assigned_provider_id, Some(Nullable::Null));
        let serialized = serde_json::to_value(&dto).unwrap();
        assert_eq!(serialized["assignedProviderId"], Value::Null);
    }

    #[test]
    fn test_null_not_allowed_elsewhere() {
        let mut cx = cx();
        assert!(
            normalize_update(&json!({"version": 1, "notes": null}), &FieldPath::root(), &mut cx)
                .is_none()
        );
        assert_eq!(
            cx.into_errors().at("notes").next().unwrap().code,
            ViolationCode::NullNotAllowed
        );
    }

    #[test]
    fn test_tenant_cannot_change() {
        let mut cx = cx();
        let value = json!({"version": 1, "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11"});
        assert!(normalize_update(&value, &FieldPath::root(), &mut cx).is_none());
        assert_eq!(
            cx.into_errors().at("tenantId").next().unwrap().code,
            ViolationCode::UnknownKey
        );
    }

    #[test]
    fn test_top_level_keys_not_defaulted_but_nested_are() {
        let mut cx = cx();
        let dto = normalize_update(
            &json!({"version": 1, "communicationPreferences": {"doNotContact": true}}),
            &FieldPath::root(),
            &mut cx,
        )
        .unwrap();
        assert!(dto.changes.status.is_none());
        assert!(dto.changes.tags.is_none());
        let prefs = dto.changes.communication_preferences.unwrap();
        assert_eq!(prefs.enabled_channels, vec![Channel::Email]);
        assert!(!prefs.appointment_reminders);
    }
}
