//! Person name and demographics

use super::context::ValidationContext;
use super::enums::{Gender, MaritalStatus};
use super::fields::Fields;
use super::node::Schema;
use super::primitives::{
    enum_value, list, past_date, text, Pattern, Text, Transform, NAME, SHORT_NAME,
};
use crate::domain::FieldPath;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PersonName {
    /// "First Last", or "Preferred Last" when a preferred name is set
    pub fn display_name(&self) -> String {
        let first = self.preferred_name.as_deref().unwrap_or(&self.first_name);
        format!("{first} {}", self.last_name)
    }
}

pub struct PersonNameRaw {
    first_name: Option<String>,
    last_name: Option<String>,
    middle_name: Option<String>,
    preferred_name: Option<String>,
    suffix: Option<String>,
    title: Option<String>,
}

impl Schema for PersonName {
    type Raw = PersonNameRaw;
    const KEYS: &'static [&'static str] = &[
        "firstName",
        "lastName",
        "middleName",
        "preferredName",
        "suffix",
        "title",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> PersonNameRaw {
        PersonNameRaw {
            first_name: fields.required(cx, "firstName", text(NAME)),
            last_name: fields.required(cx, "lastName", text(NAME)),
            middle_name: fields.optional(cx, "middleName", text(NAME)),
            preferred_name: fields.optional(cx, "preferredName", text(NAME)),
            suffix: fields.optional(cx, "suffix", text(SHORT_NAME)),
            title: fields.optional(cx, "title", text(SHORT_NAME)),
        }
    }

    fn build(raw: PersonNameRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            first_name: raw.first_name?,
            last_name: raw.last_name?,
            middle_name: raw.middle_name,
            preferred_name: raw.preferred_name,
            suffix: raw.suffix,
            title: raw.title,
        })
    }
}

const SSN: Text = Text::new(9, 11)
    .transform(Transform::DashedSsn)
    .pattern(Pattern::Ssn);
const LANGUAGE: Text = Text::new(2, 6).pattern(Pattern::Language);
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    pub race: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
    pub preferred_language: String,
}

impl Demographics {
    /// Whole years between the date of birth and `today`
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.date_of_birth).unwrap_or(0)
    }
}

pub struct DemographicsRaw {
    date_of_birth: Option<NaiveDate>,
    gender: Option<Gender>,
    marital_status: Option<MaritalStatus>,
    race: Option<Vec<String>>,
    ethnicity: Option<String>,
    occupation: Option<String>,
    employer: Option<String>,
    ssn: Option<String>,
    preferred_language: Option<String>,
}

impl Schema for Demographics {
    type Raw = DemographicsRaw;
    const KEYS: &'static [&'static str] = &[
        "dateOfBirth",
        "gender",
        "maritalStatus",
        "race",
        "ethnicity",
        "occupation",
        "employer",
        "ssn",
        "preferredLanguage",
    ];

    fn read(fields: &Fields<'_>, cx: &mut ValidationContext) -> DemographicsRaw {
        DemographicsRaw {
            date_of_birth: fields.required(cx, "dateOfBirth", past_date),
            gender: fields.required(cx, "gender", enum_value::<Gender>),
            marital_status: fields.optional(cx, "maritalStatus", enum_value::<MaritalStatus>),
            race: fields.optional(cx, "race", list(text(NAME), 0, 10)),
            ethnicity: fields.optional(cx, "ethnicity", text(NAME)),
            occupation: fields.optional(cx, "occupation", text(NAME)),
            employer: fields.optional(cx, "employer", text(NAME)),
            ssn: fields.optional(cx, "ssn", text(SSN)),
            preferred_language: fields.optional(cx, "preferredLanguage", text(LANGUAGE)),
        }
    }

    fn build(raw: DemographicsRaw, _: &FieldPath, _: &mut ValidationContext) -> Option<Self> {
        Some(Self {
            date_of_birth: raw.date_of_birth?,
            gender: raw.gender?,
            marital_status: raw.marital_status,
            race: raw.race.unwrap_or_default(),
            ethnicity: raw.ethnicity,
            occupation: raw.occupation,
            employer: raw.employer,
            ssn: raw.ssn,
            preferred_language: raw
                .preferred_language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }
}
