//! Export request

use super::query::QueryPatientsDto;
use crate::domain::{FieldPath, PatientId, ViolationCode};
use crate::schema::context::ValidationContext;
use crate::schema::enums::ExportFormat;
use crate::schema::fields::Fields;
use crate::schema::node::{parse, Refinement, Schema};
use crate::schema::patient::{is_patient_field, CANONICAL_SHAPE};
use crate::schema::primitives::{boolean, enum_value, id, list, text, Text, ACTOR};
use serde::Serialize;
use serde_json::Value;

const MAX_EXPORT_IDS: usize = 10_000;
const FIELD_NAME: Text = Text::new(1, 64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPatientsDto {
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_ids: Option<Vec<PatientId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<QueryPatientsDto>,
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    pub include_medical: bool,
    pub include_insurance: bool,
    pub anonymize: bool,
    pub requested_by: String,
}

impl ExportPatientsDto {
    /// Canonical keys that end up in the export, in canonical order
    ///
    /// An empty include list means every field. `medical` and `insurance`
    /// are only present when their flag is set.
    pub fn selected_fields(&self) -> Vec<&'static str> {
        CANONICAL_SHAPE
            .keys()
            .into_iter()
            .filter(|key| {
                self.include_fields.is_empty() || self.include_fields.iter().any(|f| f == key)
            })
            .filter(|key| !self.exclude_fields.iter().any(|f| f == key))
            .filter(|key| match *key {
                "medical" => self.include_medical,
                "insurance" => self.include_insurance,
                _ => true,
            })
            .collect()
    }
}

pub struct ExportPatientsRaw {
    format: Option<ExportFormat>,
    patient_ids: Option<Vec<PatientId>>,
    filters: Option<QueryPatientsDto>,
    include_fields: Option<Vec<String>>,
    exclude_fields: Option<Vec<String>>,
    include_medical: Option<bool>,
    include_insurance: Option<bool>,
    anonymize: Option<bool>,
    requested_by: Option<String>,
}

fn field_name(value: &Value, path: &FieldPath, cx: &mut ValidationContext) -> Option<String> {
    let name = text(FIELD_NAME)(value, path, cx)?;
    if !is_patient_field(&name) {
        cx.report(
            path,
            ViolationCode::UnknownFieldName,
            format!("'{name}' is not a patient field"),
        );
        return None;
    }
    Some(name)
}

fn disjoint_selection(dto: &mut ExportPatientsDto, path: &FieldPath, cx: &mut ValidationContext) {
    for (index, name) in dto.exclude_fields.iter().enumerate() {
        if dto.include_fields.contains(name) {
            cx.report(
                &path.key("excludeFields").index(index),
                ViolationCode::ConflictingSelection,
                format!("'{name}' is both included and excluded"),
            );
        }
    }
}

impl Schema for ExportPatientsDto {
    type Raw = ExportPatientsRaw;
    const KEYS: &'static [&'static str] = &[
        "format",
        "patientIds",
        "filters",
        "includeFields",
        "excludeFields",
        "includeMedical",
        "includeInsurance",
        "anonymize",
        "requestedBy",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[disjoint_selection];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ExportPatientsRaw {
        if !fields.contains("patientIds") && !fields.contains("filters") {
            cx.report(
                &fields.path().key("patientIds"),
                ViolationCode::ScopeRequired,
                "either patientIds or filters must be supplied",
            );
        }

        ExportPatientsRaw {
            format: fields.optional(cx, "format", enum_value::<ExportFormat>),
            patient_ids: fields.optional(
                cx,
                "patientIds",
                list(id::<PatientId>, 1, MAX_EXPORT_IDS),
            ),
            filters: fields.optional(cx, "filters", parse::<QueryPatientsDto>),
            include_fields: fields.optional(cx, "includeFields", list(field_name, 0, 64)),
            exclude_fields: fields.optional(cx, "excludeFields", list(field_name, 0, 64)),
            include_medical: fields.optional(cx, "includeMedical", boolean),
            include_insurance: fields.optional(cx, "includeInsurance", boolean),
            anonymize: fields.optional(cx, "anonymize", boolean),
            requested_by: fields.required(cx, "requestedBy", text(ACTOR)),
        }
    }

    fn build(raw: ExportPatientsRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            format: raw.format.unwrap_or_default(),
            patient_ids: raw.patient_ids,
            filters: raw.filters,
            include_fields: raw.include_fields.unwrap_or_default(),
            exclude_fields: raw.exclude_fields.unwrap_or_default(),
            include_medical: raw.include_medical.unwrap_or(false),
            include_insurance: raw.include_insurance.unwrap_or(false),
            anonymize: raw.anonymize.unwrap_or(false),
            requested_by: raw.requested_by?,
        })
    }
}
