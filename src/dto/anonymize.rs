//! Anonymize request
//!
//! Anonymization cannot be undone, so the request must carry
//! `confirmIrreversible: true` verbatim. Any other value, including a missing
//! key or the string `"true"`, is a guard violation reported together with
//! whatever else is wrong with the request.

use crate::domain::{FieldPath, PatientId, ViolationCode};
use crate::schema::context::ValidationContext;
use crate::schema::enums::AnonymizationStrategy;
use crate::schema::fields::Fields;
use crate::schema::node::Schema;
use crate::schema::primitives::{describe, enum_value, id, text, ACTOR, REASON};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymizePatientDto {
    pub patient_id: PatientId,
    pub reason: String,
    pub performed_by: String,
    pub strategy: AnonymizationStrategy,
    pub confirm_irreversible: bool,
}

pub struct AnonymizePatientRaw {
    patient_id: Option<PatientId>,
    reason: Option<String>,
    performed_by: Option<String>,
    strategy: Option<AnonymizationStrategy>,
    confirmed: bool,
}

fn confirmation(fields: &Fields<'_>, cx: &mut ValidationContext) -> bool {
    let path = fields.path().key("confirmIrreversible");
    match fields.raw("confirmIrreversible") {
        Some(Value::Bool(true)) => true,
        None => {
            cx.report(
                &path,
                ViolationCode::ConfirmationRequired,
                "confirmIrreversible must be true to anonymize a patient",
            );
            false
        }
        Some(other) => {
            cx.report(
                &path,
                ViolationCode::ConfirmationRequired,
                format!("confirmIrreversible must be the literal true, found {}", describe(other)),
            );
            false
        }
    }
}

impl Schema for AnonymizePatientDto {
    type Raw = AnonymizePatientRaw;
    const KEYS: &'static [&'static str] = &[
        "patientId",
        "reason",
        "performedBy",
        "strategy",
        "confirmIrreversible",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> AnonymizePatientRaw {
        AnonymizePatientRaw {
            patient_id: fields.required(cx, "patientId", id::<PatientId>),
            reason: fields.required(cx, "reason", text(REASON)),
            performed_by: fields.required(cx, "performedBy", text(ACTOR)),
            strategy: fields.optional(cx, "strategy", enum_value::<AnonymizationStrategy>),
            confirmed: confirmation(fields, cx),
        }
    }

    fn build(raw: AnonymizePatientRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            patient_id: raw.patient_id?,
            reason: raw.reason?,
            performed_by: raw.performed_by?,
            strategy: raw.strategy.unwrap_or_default(),
            confirm_irreversible: raw.confirmed.then_some(true)?,
        })
    }
}
