//! Irreversible patient anonymization
//!
//! Direct identifiers are removed or replaced, quasi-identifiers generalized:
//!
//! | Data                          | Treatment                          |
//! |-------------------------------|------------------------------------|
//! | patient number                | tokenized                          |
//! | first and last name           | replaced                           |
//! | other name parts              | removed                            |
//! | phones, emails, addresses     | removed                            |
//! | emergency contacts            | removed                            |
//! | SSN, employer, occupation     | removed                            |
//! | race, ethnicity               | removed                            |
//! | date of birth                 | generalized to 1 January           |
//! | insurance                     | removed                            |
//! | clinical free text, notes     | removed or replaced                |
//! | metadata, referral source     | cleared                            |
//! | communication                 | `doNotContact`, all opt-ins off    |
//!
//! Record ids, status, coded clinical data and audit columns are kept.

use crate::core::lifecycle::{revalidate, touch};
use crate::core::validator::Validator;
use crate::domain::{FieldPath, PatientId, Result, ValidationErrors, Violation, ViolationCode};
use crate::dto::AnonymizePatientDto;
use crate::schema::contact::PatientContacts;
use crate::schema::enums::AnonymizationStrategy;
use crate::schema::patient::Patient;
use chrono::Datelike;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const REDACTED: &str = "[REDACTED]";
const TOKEN_PREFIX: &str = "ANON-";
const TOKEN_HEX_LEN: usize = 12;

fn token(patient_id: PatientId, field: &str) -> String {
    let hash = Sha256::digest(format!("{patient_id}:{field}").as_bytes());
    let hex = format!("{hash:x}");
    format!("{TOKEN_PREFIX}{}", hex[..TOKEN_HEX_LEN].to_uppercase())
}

/// Scrubs patient records with one replacement strategy
#[derive(Debug, Clone, Copy)]
pub struct Anonymizer {
    strategy: AnonymizationStrategy,
}

impl Anonymizer {
    pub fn new(strategy: AnonymizationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> AnonymizationStrategy {
        self.strategy
    }

    /// Replacement text for `field` of `patient_id`
    ///
    /// Tokens are stable: the same patient and field always give the same
    /// token, and different patients give different tokens.
    pub fn replacement(&self, patient_id: PatientId, field: &str) -> String {
        match self.strategy {
            AnonymizationStrategy::Redact => REDACTED.to_string(),
            AnonymizationStrategy::Token => token(patient_id, field),
        }
    }

    /// Returns a scrubbed copy of `patient`
    ///
    /// Version and audit columns are untouched; see [`Anonymizer::apply`] for
    /// the stored transition.
    pub fn scrub(&self, patient: &Patient) -> Patient {
        let mut next = patient.clone();
        let id = patient.id;
        // must stay unique per tenant; tokenized under either strategy
        next.patient_number = token(id, "patientNumber");
        let record = &mut next.record;

        record.name.first_name = self.replacement(id, "name.firstName");
        record.name.last_name = self.replacement(id, "name.lastName");
        record.name.middle_name = None;
        record.name.preferred_name = None;
        record.name.suffix = None;
        record.name.title = None;

        let demographics = &mut record.demographics;
        let dob = demographics.date_of_birth;
        demographics.date_of_birth = dob.with_ordinal(1).unwrap_or(dob);
        demographics.ssn = None;
        demographics.employer = None;
        demographics.occupation = None;
        demographics.race.clear();
        demographics.ethnicity = None;

        record.contacts = PatientContacts {
            phones: Vec::new(),
            emails: Vec::new(),
            addresses: Vec::new(),
            preferred_contact_method: record.contacts.preferred_contact_method,
        };
        record.emergency_contacts.clear();
        record.insurance = None;

        if let Some(medical) = record.medical.as_mut() {
            for allergy in &mut medical.allergies {
                allergy.notes = None;
            }
            for condition in &mut medical.conditions {
                condition.notes = None;
            }
            for medication in &mut medical.medications {
                medication.prescribed_by = None;
            }
            for (i, alert) in medical.alerts.iter_mut().enumerate() {
                alert.message = self.replacement(id, &format!("medical.alerts[{i}].message"));
            }
        }

        for consent in &mut record.consents {
            consent.notes = None;
        }

        let prefs = &mut record.communication_preferences;
        prefs.do_not_contact = true;
        prefs.appointment_reminders = false;
        prefs.medication_reminders = false;
        prefs.health_education = false;
        prefs.marketing_messages = false;
        prefs.surveys = false;
        prefs.preferred_contact_time = None;

        record.referral_source = None;
        record.notes = None;

        let mut metadata = Map::new();
        metadata.insert("anonymized".to_string(), Value::Bool(true));
        metadata.insert(
            "anonymizationStrategy".to_string(),
            Value::String(self.strategy.to_string()),
        );
        record.metadata = metadata;

        next
    }

    /// Anonymizes a stored patient under a validated request
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Validation`](crate::domain::ContractError::Validation)
    /// if the request names another patient or the scrubbed record fails the
    /// canonical contract.
    pub fn apply(
        validator: &Validator,
        patient: &Patient,
        dto: &AnonymizePatientDto,
    ) -> Result<Patient> {
        if dto.patient_id != patient.id {
            return Err(ValidationErrors::from(Violation::new(
                FieldPath::root().key("patientId"),
                ViolationCode::InvalidTransition,
                format!(
                    "request targets {} but patient {} was supplied",
                    dto.patient_id, patient.id
                ),
            ))
            .into());
        }

        let now = validator.now();
        let mut next = Self::new(dto.strategy).scrub(patient);
        next.record
            .metadata
            .insert("anonymizedAt".to_string(), Value::String(now.to_rfc3339()));
        touch(&mut next, &dto.performed_by, now);

        tracing::info!(
            patient_id = %patient.id,
            strategy = %dto.strategy,
            "Patient anonymized"
        );
        revalidate(validator, &next)
    }
}
