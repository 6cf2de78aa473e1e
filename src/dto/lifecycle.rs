//! Archive and restore requests

use crate::domain::{FieldPath, PatientId};
use crate::schema::context::ValidationContext;
use crate::schema::fields::Fields;
use crate::schema::node::Schema;
use crate::schema::primitives::{id, text, ACTOR, REASON};
use serde::Serialize;

/// Soft-delete a patient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePatientDto {
    pub patient_id: PatientId,
    pub reason: String,
    pub performed_by: String,
}

pub struct ArchivePatientRaw {
    patient_id: Option<PatientId>,
    reason: Option<String>,
    performed_by: Option<String>,
}

impl Schema for ArchivePatientDto {
    type Raw = ArchivePatientRaw;
    const KEYS: &'static [&'static str] = &["patientId", "reason", "performedBy"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ArchivePatientRaw {
        ArchivePatientRaw {
            patient_id: fields.required(cx, "patientId", id::<PatientId>),
            reason: fields.required(cx, "reason", text(REASON)),
            performed_by: fields.required(cx, "performedBy", text(ACTOR)),
        }
    }

    fn build(raw: ArchivePatientRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            patient_id: raw.patient_id?,
            reason: raw.reason?,
            performed_by: raw.performed_by?,
        })
    }
}

/// Reverse a soft delete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePatientDto {
    pub patient_id: PatientId,
    pub performed_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct RestorePatientRaw {
    patient_id: Option<PatientId>,
    performed_by: Option<String>,
    reason: Option<String>,
}

impl Schema for RestorePatientDto {
    type Raw = RestorePatientRaw;
    const KEYS: &'static [&'static str] = &["patientId", "performedBy", "reason"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> RestorePatientRaw {
        RestorePatientRaw {
            patient_id: fields.required(cx, "patientId", id::<PatientId>),
            performed_by: fields.required(cx, "performedBy", text(ACTOR)),
            reason: fields.optional(cx, "reason", text(REASON)),
        }
    }

    fn build(raw: RestorePatientRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            patient_id: raw.patient_id?,
            performed_by: raw.performed_by?,
            reason: raw.reason,
        })
    }
}
