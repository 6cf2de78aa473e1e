//! Merge request

use crate::domain::{FieldPath, PatientId, ViolationCode};
use crate::schema::context::ValidationContext;
use crate::schema::fields::Fields;
use crate::schema::node::{defaulted, parse, Refinement, Schema};
use crate::schema::primitives::{boolean, id, text, ACTOR, REASON};
use serde::Serialize;

/// How to reconcile the two records
///
/// The defaults keep the target's identity fields and accumulate list-like
/// data from both sides. No combination is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub prefer_source_demographics: bool,
    pub prefer_source_contacts: bool,
    pub merge_insurance: bool,
    pub merge_medical_history: bool,
    pub merge_appointments: bool,
    pub merge_treatments: bool,
    pub merge_documents: bool,
    pub merge_tags: bool,
}

impl Default for ConflictResolution {
    fn default() -> Self {
        Self {
            prefer_source_demographics: false,
            prefer_source_contacts: false,
            merge_insurance: true,
            merge_medical_history: true,
            merge_appointments: true,
            merge_treatments: true,
            merge_documents: true,
            merge_tags: true,
        }
    }
}

pub struct ConflictResolutionRaw {
    flags: [Option<bool>; 8],
}

impl Schema for ConflictResolution {
    type Raw = ConflictResolutionRaw;
    const KEYS: &'static [&'static str] = &[
        "preferSourceDemographics",
        "preferSourceContacts",
        "mergeInsurance",
        "mergeMedicalHistory",
        "mergeAppointments",
        "mergeTreatments",
        "mergeDocuments",
        "mergeTags",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ConflictResolutionRaw {
        let mut flags = [None; 8];
        for (slot, key) in flags.iter_mut().zip(Self::KEYS) {
            *slot = fields.optional(cx, key, boolean);
        }
        ConflictResolutionRaw { flags }
    }

    fn build(raw: ConflictResolutionRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        let d = Self::default();
        let [a, b, c, e, f, g, h, i] = raw.flags;
        Some(Self {
            prefer_source_demographics: a.unwrap_or(d.prefer_source_demographics),
            prefer_source_contacts: b.unwrap_or(d.prefer_source_contacts),
            merge_insurance: c.unwrap_or(d.merge_insurance),
            merge_medical_history: e.unwrap_or(d.merge_medical_history),
            merge_appointments: f.unwrap_or(d.merge_appointments),
            merge_treatments: g.unwrap_or(d.merge_treatments),
            merge_documents: h.unwrap_or(d.merge_documents),
            merge_tags: i.unwrap_or(d.merge_tags),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePatientsDto {
    /// Record absorbed by the merge
    pub source_patient_id: PatientId,
    /// Record that survives
    pub target_patient_id: PatientId,
    pub reason: String,
    pub performed_by: String,
    pub conflict_resolution: ConflictResolution,
}

pub struct MergePatientsRaw {
    source_patient_id: Option<PatientId>,
    target_patient_id: Option<PatientId>,
    reason: Option<String>,
    performed_by: Option<String>,
    conflict_resolution: Option<ConflictResolution>,
}

fn distinct_records(dto: &mut MergePatientsDto, path: &FieldPath, cx: &mut ValidationContext) {
    if dto.source_patient_id == dto.target_patient_id {
        cx.report(
            &path.key("targetPatientId"),
            ViolationCode::IdenticalIdentifiers,
            "a patient cannot be merged into itself",
        );
    }
}

impl Schema for MergePatientsDto {
    type Raw = MergePatientsRaw;
    const KEYS: &'static [&'static str] = &[
        "sourcePatientId",
        "targetPatientId",
        "reason",
        "performedBy",
        "conflictResolution",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[distinct_records];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> MergePatientsRaw {
        MergePatientsRaw {
            source_patient_id: fields.required(cx, "sourcePatientId", id::<PatientId>),
            target_patient_id: fields.required(cx, "targetPatientId", id::<PatientId>),
            reason: fields.required(cx, "reason", text(REASON)),
            performed_by: fields.required(cx, "performedBy", text(ACTOR)),
            conflict_resolution: fields.optional(
                cx,
                "conflictResolution",
                parse::<ConflictResolution>,
            ),
        }
    }

    fn build(raw: MergePatientsRaw, path: &FieldPath, cx: &mut ValidationContext) -> Option<Self> {
        let conflict_resolution = match raw.conflict_resolution {
            Some(resolution) => resolution,
            None => defaulted(&path.key("conflictResolution"), cx)?,
        };
        Some(Self {
            source_patient_id: raw.source_patient_id?,
            target_patient_id: raw.target_patient_id?,
            reason: raw.reason?,
            performed_by: raw.performed_by?,
            conflict_resolution,
        })
    }
}
