//! Medical annotations
//!
//! Structured, free-standing entries. Nothing here interprets clinical
//! meaning; the rules are shape and date ordering only.

use super::context::ValidationContext;
use super::enums::{AlertSeverity, AlertType, AllergySeverity, ConditionStatus};
use super::fields::Fields;
use super::node::{parse, Refinement, Schema};
use super::primitives::{
    boolean, date, datetime, enum_value, list, past_date, text, Pattern, Text, Transform, ACTOR,
    NOTES,
};
use crate::domain::{FieldPath, ViolationCode};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

const LABEL: Text = Text::new(1, 200);
const DETAIL: Text = Text::new(1, 100);
const ICD_CODE: Text = Text::new(3, 8)
    .transform(Transform::Upper)
    .pattern(Pattern::Icd10);
const ALERT_MESSAGE: Text = Text::new(1, 1000);
pub(crate) const MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub allergen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    pub severity: AllergySeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct AllergyRaw {
    allergen: Option<String>,
    reaction: Option<String>,
    severity: Option<AllergySeverity>,
    onset_date: Option<NaiveDate>,
    notes: Option<String>,
}

impl Schema for Allergy {
    type Raw = AllergyRaw;
    const KEYS: &'static [&'static str] = &["allergen", "reaction", "severity", "onsetDate", "notes"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> AllergyRaw {
        AllergyRaw {
            allergen: fields.required(cx, "allergen", text(LABEL)),
            reaction: fields.optional(cx, "reaction", text(LABEL)),
            severity: fields.optional(cx, "severity", enum_value::<AllergySeverity>),
            onset_date: fields.optional(cx, "onsetDate", past_date),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: AllergyRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            allergen: raw.allergen?,
            reaction: raw.reaction,
            severity: raw.severity.unwrap_or_default(),
            onset_date: raw.onset_date,
            notes: raw.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
}

pub struct MedicationRaw {
    name: Option<String>,
    dosage: Option<String>,
    frequency: Option<String>,
    prescribed_by: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    is_active: Option<bool>,
}

fn medication_dates(node: &mut Medication, path: &FieldPath, cx: &mut ValidationContext) {
    if let (Some(start), Some(end)) = (node.start_date, node.end_date) {
        if end < start {
            cx.report(
                &path.key("endDate"),
                ViolationCode::DateOrdering,
                "endDate must not be before startDate",
            );
        }
    }
}

impl Schema for Medication {
    type Raw = MedicationRaw;
    const KEYS: &'static [&'static str] = &[
        "name",
        "dosage",
        "frequency",
        "prescribedBy",
        "startDate",
        "endDate",
        "isActive",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[medication_dates];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> MedicationRaw {
        MedicationRaw {
            name: fields.required(cx, "name", text(LABEL)),
            dosage: fields.optional(cx, "dosage", text(DETAIL)),
            frequency: fields.optional(cx, "frequency", text(DETAIL)),
            prescribed_by: fields.optional(cx, "prescribedBy", text(DETAIL)),
            start_date: fields.optional(cx, "startDate", date),
            end_date: fields.optional(cx, "endDate", date),
            is_active: fields.optional(cx, "isActive", boolean),
        }
    }

    fn build(raw: MedicationRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            name: raw.name?,
            dosage: raw.dosage,
            frequency: raw.frequency,
            prescribed_by: raw.prescribed_by,
            start_date: raw.start_date,
            end_date: raw.end_date,
            is_active: raw.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icd_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosed_date: Option<NaiveDate>,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub struct ConditionRaw {
    name: Option<String>,
    icd_code: Option<String>,
    diagnosed_date: Option<NaiveDate>,
    status: Option<ConditionStatus>,
    notes: Option<String>,
}

impl Schema for Condition {
    type Raw = ConditionRaw;
    const KEYS: &'static [&'static str] = &["name", "icdCode", "diagnosedDate", "status", "notes"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> ConditionRaw {
        ConditionRaw {
            name: fields.required(cx, "name", text(LABEL)),
            icd_code: fields.optional(cx, "icdCode", text(ICD_CODE)),
            diagnosed_date: fields.optional(cx, "diagnosedDate", past_date),
            status: fields.optional(cx, "status", enum_value::<ConditionStatus>),
            notes: fields.optional(cx, "notes", text(NOTES)),
        }
    }

    fn build(raw: ConditionRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            name: raw.name?,
            icd_code: raw.icd_code,
            diagnosed_date: raw.diagnosed_date,
            status: raw.status.unwrap_or_default(),
            notes: raw.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub message: String,
    pub severity: AlertSeverity,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Active while `expiresAt` is absent or after `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }
}

pub struct AlertRaw {
    kind: Option<AlertType>,
    message: Option<String>,
    severity: Option<AlertSeverity>,
    created_at: Option<DateTime<Utc>>,
    created_by: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

fn alert_expiry(node: &mut Alert, path: &FieldPath, cx: &mut ValidationContext) {
    if let Some(expires_at) = node.expires_at {
        if expires_at < node.created_at {
            cx.report(
                &path.key("expiresAt"),
                ViolationCode::DateOrdering,
                "expiresAt must not be before createdAt",
            );
        }
    }
}

impl Schema for Alert {
    type Raw = AlertRaw;
    const KEYS: &'static [&'static str] =
        &["type", "message", "severity", "createdAt", "createdBy", "expiresAt"];
    const REFINEMENTS: &'static [Refinement<Self>] = &[alert_expiry];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> AlertRaw {
        AlertRaw {
            kind: fields.optional(cx, "type", enum_value::<AlertType>),
            message: fields.required(cx, "message", text(ALERT_MESSAGE)),
            severity: fields.optional(cx, "severity", enum_value::<AlertSeverity>),
            created_at: fields.required(cx, "createdAt", datetime),
            created_by: fields.required(cx, "createdBy", text(ACTOR)),
            expires_at: fields.optional(cx, "expiresAt", datetime),
        }
    }

    fn build(raw: AlertRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            kind: raw.kind.unwrap_or_default(),
            message: raw.message?,
            severity: raw.severity.unwrap_or_default(),
            created_at: raw.created_at?,
            created_by: raw.created_by?,
            expires_at: raw.expires_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalFlags {
    pub allergies: Vec<Allergy>,
    pub medications: Vec<Medication>,
    pub conditions: Vec<Condition>,
    pub alerts: Vec<Alert>,
}

impl MedicalFlags {
    pub fn active_alerts(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(move |alert| alert.is_active(now))
    }
}

pub struct MedicalFlagsRaw {
    allergies: Option<Vec<Allergy>>,
    medications: Option<Vec<Medication>>,
    conditions: Option<Vec<Condition>>,
    alerts: Option<Vec<Alert>>,
}

impl Schema for MedicalFlags {
    type Raw = MedicalFlagsRaw;
    const KEYS: &'static [&'static str] = &["allergies", "medications", "conditions", "alerts"];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> MedicalFlagsRaw {
        MedicalFlagsRaw {
            allergies: fields.optional(cx, "allergies", list(parse::<Allergy>, 0, MAX_ENTRIES)),
            medications: fields.optional(
                cx,
                "medications",
                list(parse::<Medication>, 0, MAX_ENTRIES),
            ),
            conditions: fields.optional(
                cx,
                "conditions",
                list(parse::<Condition>, 0, MAX_ENTRIES),
            ),
            alerts: fields.optional(cx, "alerts", list(parse::<Alert>, 0, MAX_ENTRIES)),
        }
    }

    fn build(raw: MedicalFlagsRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            allergies: raw.allergies.unwrap_or_default(),
            medications: raw.medications.unwrap_or_default(),
            conditions: raw.conditions.unwrap_or_default(),
            alerts: raw.alerts.unwrap_or_default(),
        })
    }
}
