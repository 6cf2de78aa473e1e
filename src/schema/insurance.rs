//! Insurance coverage and the three-tier slot record

use super::context::ValidationContext;
use super::enums::{CoverageType, FieldEnum, SubscriberRelationship};
use super::fields::Fields;
use super::node::{parse_with, Refinement, Schema};
use super::primitives::{boolean, date, enum_value, text, Pattern, Text};
use crate::domain::{FieldPath, ViolationCode};
use chrono::NaiveDate;
use serde::Serialize;

const POLICY_NUMBER: Text = Text::new(1, 50).pattern(Pattern::PolicyNumber);
const PROVIDER: Text = Text::new(1, 200);
const GROUP_NUMBER: Text = Text::new(1, 50);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceCoverage {
    pub provider: String,
    pub policy_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_number: Option<String>,
    pub subscriber_name: String,
    pub subscriber_relationship: SubscriberRelationship,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_date: Option<NaiveDate>,
    pub coverage_type: CoverageType,
    pub is_active: bool,
}

impl InsuranceCoverage {
    /// True if the coverage is flagged active and `on` is inside its dates
    pub fn covers(&self, on: NaiveDate) -> bool {
        self.is_active
            && self.effective_date.map_or(true, |start| start <= on)
            && self.termination_date.map_or(true, |end| on <= end)
    }
}

pub struct InsuranceCoverageRaw {
    provider: Option<String>,
    policy_number: Option<String>,
    group_number: Option<String>,
    subscriber_name: Option<String>,
    subscriber_relationship: Option<SubscriberRelationship>,
    subscriber_date_of_birth: Option<NaiveDate>,
    effective_date: Option<NaiveDate>,
    termination_date: Option<NaiveDate>,
    coverage_type: Option<CoverageType>,
    is_active: Option<bool>,
    slot: Option<CoverageType>,
}

fn coverage_dates(node: &mut InsuranceCoverage, path: &FieldPath, cx: &mut ValidationContext) {
    if let (Some(effective), Some(termination)) = (node.effective_date, node.termination_date) {
        if termination < effective {
            cx.report(
                &path.key("terminationDate"),
                ViolationCode::DateOrdering,
                "terminationDate must not be before effectiveDate",
            );
        }
    }
}

impl Schema for InsuranceCoverage {
    type Raw = InsuranceCoverageRaw;
    const KEYS: &'static [&'static str] = &[
        "provider",
        "policyNumber",
        "groupNumber",
        "subscriberName",
        "subscriberRelationship",
        "subscriberDateOfBirth",
        "effectiveDate",
        "terminationDate",
        "coverageType",
        "isActive",
    ];
    const REFINEMENTS: &'static [Refinement<Self>] = &[coverage_dates];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> InsuranceCoverageRaw {
        InsuranceCoverageRaw {
            provider: fields.required(cx, "provider", text(PROVIDER)),
            policy_number: fields.required(cx, "policyNumber", text(POLICY_NUMBER)),
            group_number: fields.optional(cx, "groupNumber", text(GROUP_NUMBER)),
            subscriber_name: fields.required(cx, "subscriberName", text(Text::new(1, 200))),
            subscriber_relationship: fields.optional(
                cx,
                "subscriberRelationship",
                enum_value::<SubscriberRelationship>,
            ),
            subscriber_date_of_birth: fields.optional(cx, "subscriberDateOfBirth", date),
            effective_date: fields.optional(cx, "effectiveDate", date),
            termination_date: fields.optional(cx, "terminationDate", date),
            coverage_type: fields.optional(cx, "coverageType", enum_value::<CoverageType>),
            is_active: fields.optional(cx, "isActive", boolean),
            slot: None,
        }
    }

    fn build(raw: InsuranceCoverageRaw, path: &FieldPath, cx: &mut ValidationContext) -> Option<Self> {
        let slot = raw.slot.unwrap_or(CoverageType::Primary);
        let coverage_type = raw.coverage_type.unwrap_or(slot);
        if coverage_type != slot {
            cx.report(
                &path.key("coverageType"),
                ViolationCode::CoverageTypeMismatch,
                format!("coverageType '{coverage_type}' does not match the {slot} slot"),
            );
            return None;
        }

        Some(Self {
            provider: raw.provider?,
            policy_number: raw.policy_number?,
            group_number: raw.group_number,
            subscriber_name: raw.subscriber_name?,
            subscriber_relationship: raw.subscriber_relationship.unwrap_or_default(),
            subscriber_date_of_birth: raw.subscriber_date_of_birth,
            effective_date: raw.effective_date,
            termination_date: raw.termination_date,
            coverage_type,
            is_active: raw.is_active.unwrap_or(true),
        })
    }
}

/// Parser for the coverage occupying `slot`
fn coverage_in(
    slot: CoverageType,
) -> impl FnOnce(&serde_json::Value, &FieldPath, &mut ValidationContext) -> Option<InsuranceCoverage>
{
    parse_with::<InsuranceCoverage>(move |raw| raw.slot = Some(slot))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInsurance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<InsuranceCoverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<InsuranceCoverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tertiary: Option<InsuranceCoverage>,
}

impl PatientInsurance {
    /// Populated slots in tier order
    pub fn coverages(&self) -> impl Iterator<Item = &InsuranceCoverage> {
        [&self.primary, &self.secondary, &self.tertiary]
            .into_iter()
            .flatten()
    }

    fn slot(&self, tier: CoverageType) -> Option<&InsuranceCoverage> {
        match tier {
            CoverageType::Primary => self.primary.as_ref(),
            CoverageType::Secondary => self.secondary.as_ref(),
            CoverageType::Tertiary => self.tertiary.as_ref(),
        }
    }
}

pub struct PatientInsuranceRaw {
    primary: Option<InsuranceCoverage>,
    secondary: Option<InsuranceCoverage>,
    tertiary: Option<InsuranceCoverage>,
}

fn tier_ordering(node: &mut PatientInsurance, path: &FieldPath, cx: &mut ValidationContext) {
    for pair in CoverageType::ALL.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if node.slot(upper).is_some() && node.slot(lower).is_none() {
            cx.report(
                &path.key(upper.as_str()),
                ViolationCode::InvalidTierOrdering,
                format!("{upper} coverage requires {lower} coverage"),
            );
        }
    }
}

impl Schema for PatientInsurance {
    type Raw = PatientInsuranceRaw;
    const KEYS: &'static [&'static str] = &["primary", "secondary", "tertiary"];
    const REFINEMENTS: &'static [Refinement<Self>] = &[tier_ordering];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> PatientInsuranceRaw {
        PatientInsuranceRaw {
            primary: fields.optional(cx, "primary", coverage_in(CoverageType::Primary)),
            secondary: fields.optional(cx, "secondary", coverage_in(CoverageType::Secondary)),
            tertiary: fields.optional(cx, "tertiary", coverage_in(CoverageType::Tertiary)),
        }
    }

    fn build(raw: PatientInsuranceRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            primary: raw.primary,
            secondary: raw.secondary,
            tertiary: raw.tertiary,
        })
    }
}
