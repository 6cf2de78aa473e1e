//! Create projection

use crate::domain::{ClinicId, FieldPath, OrganizationId, TenantId};
use crate::schema::context::ValidationContext;
use crate::schema::node::{refine, Refinement};
use crate::schema::patient::{read_patient, PatientRecord, CREATE_SHAPE, RECORD_REFINEMENTS};
use serde::Serialize;
use serde_json::Value;

/// A new patient as submitted by a client
///
/// Carries no server-assigned keys. `patient_number` is absent when the store
/// is expected to generate one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientDto {
    pub tenant_id: TenantId,
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<ClinicId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_number: Option<String>,
    #[serde(flatten)]
    pub record: PatientRecord,
}

fn record_rules(dto: &mut CreatePatientDto, path: &FieldPath, cx: &mut ValidationContext) {
    for rule in RECORD_REFINEMENTS {
        rule(&mut dto.record, path, cx);
    }
}

const CREATE_REFINEMENTS: &[Refinement<CreatePatientDto>] = &[record_rules];

pub fn normalize_create(
    value: &Value,
    path: &FieldPath,
    cx: &mut ValidationContext,
) -> Option<CreatePatientDto> {
    let mut raw = read_patient(value, path, &CREATE_SHAPE, cx)?;
    let record = PatientRecord::assemble(&mut raw, path, cx)?;
    let dto = CreatePatientDto {
        tenant_id: raw.tenant_id?,
        organization_id: raw.organization_id?,
        clinic_id: raw.clinic_id,
        patient_number: raw.patient_number,
        record,
    };
    refine(dto, CREATE_REFINEMENTS, path, cx)
}
