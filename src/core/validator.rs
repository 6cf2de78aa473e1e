//! Entry points
//!
//! [`Validator`] runs one contract per call: a fresh [`ValidationContext`],
//! the contract's parser, then either the normalized value or every
//! violation found. The free functions at the bottom use default options and
//! the system clock.

use crate::config::ContractsConfig;
use crate::domain::{FieldPath, ValidationErrors};
use crate::dto::create::normalize_create;
use crate::dto::import::normalize_bulk_import;
use crate::dto::update::normalize_update;
use crate::dto::{
    AnonymizePatientDto, ArchivePatientDto, BulkImportDto, CreatePatientDto, ExportPatientsDto,
    MergePatientsDto, QueryPatientsDto, RestorePatientDto, SendCommunicationDto, UpdatePatientDto,
};
use crate::schema::context::{ValidationContext, ValidationOptions};
use crate::schema::node::parse;
use crate::schema::patient::{normalize_patient, Patient};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Validates raw JSON against the patient contracts
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
    clock: Option<DateTime<Utc>>,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            clock: None,
        }
    }

    pub fn from_config(config: &ContractsConfig) -> Self {
        Self::new(config.validation_options())
    }

    /// Evaluates time-relative rules against `now` instead of the system clock
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn run<T>(
        &self,
        contract: &'static str,
        raw: &Value,
        normalize: impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
    ) -> Result<T, ValidationErrors> {
        let mut cx = ValidationContext::new(self.options, self.now());
        let result = normalize(raw, &FieldPath::root(), &mut cx);
        cx.finish(result).inspect_err(|errors| {
            crate::log_validation_failed!(contract, errors);
        })
    }

    /// A complete stored record
    pub fn validate_patient(&self, raw: &Value) -> Result<Patient, ValidationErrors> {
        self.run("patient", raw, normalize_patient)
    }

    pub fn validate_create(&self, raw: &Value) -> Result<CreatePatientDto, ValidationErrors> {
        self.run("create", raw, normalize_create)
    }

    pub fn validate_update(&self, raw: &Value) -> Result<UpdatePatientDto, ValidationErrors> {
        self.run("update", raw, normalize_update)
    }

    pub fn validate_query(&self, raw: &Value) -> Result<QueryPatientsDto, ValidationErrors> {
        self.run("query", raw, parse::<QueryPatientsDto>)
    }

    pub fn validate_merge(&self, raw: &Value) -> Result<MergePatientsDto, ValidationErrors> {
        self.run("merge", raw, parse::<MergePatientsDto>)
    }

    pub fn validate_export(&self, raw: &Value) -> Result<ExportPatientsDto, ValidationErrors> {
        self.run("export", raw, parse::<ExportPatientsDto>)
    }

    pub fn validate_anonymize(&self, raw: &Value) -> Result<AnonymizePatientDto, ValidationErrors> {
        self.run("anonymize", raw, parse::<AnonymizePatientDto>)
    }

    pub fn validate_archive(&self, raw: &Value) -> Result<ArchivePatientDto, ValidationErrors> {
        self.run("archive", raw, parse::<ArchivePatientDto>)
    }

    pub fn validate_restore(&self, raw: &Value) -> Result<RestorePatientDto, ValidationErrors> {
        self.run("restore", raw, parse::<RestorePatientDto>)
    }

    /// The envelope must be valid; element failures are returned inside the DTO
    pub fn validate_bulk_import(&self, raw: &Value) -> Result<BulkImportDto, ValidationErrors> {
        self.run("bulk_import", raw, normalize_bulk_import)
    }

    pub fn validate_send_communication(
        &self,
        raw: &Value,
    ) -> Result<SendCommunicationDto, ValidationErrors> {
        self.run("send_communication", raw, parse::<SendCommunicationDto>)
    }
}

pub fn validate_patient(raw: &Value) -> Result<Patient, ValidationErrors> {
    Validator::default().validate_patient(raw)
}

pub fn validate_create(raw: &Value) -> Result<CreatePatientDto, ValidationErrors> {
    Validator::default().validate_create(raw)
}

pub fn validate_update(raw: &Value) -> Result<UpdatePatientDto, ValidationErrors> {
    Validator::default().validate_update(raw)
}

pub fn validate_query(raw: &Value) -> Result<QueryPatientsDto, ValidationErrors> {
    Validator::default().validate_query(raw)
}

pub fn validate_merge(raw: &Value) -> Result<MergePatientsDto, ValidationErrors> {
    Validator::default().validate_merge(raw)
}

pub fn validate_export(raw: &Value) -> Result<ExportPatientsDto, ValidationErrors> {
    Validator::default().validate_export(raw)
}

pub fn validate_anonymize(raw: &Value) -> Result<AnonymizePatientDto, ValidationErrors> {
    Validator::default().validate_anonymize(raw)
}

pub fn validate_archive(raw: &Value) -> Result<ArchivePatientDto, ValidationErrors> {
    Validator::default().validate_archive(raw)
}

pub fn validate_restore(raw: &Value) -> Result<RestorePatientDto, ValidationErrors> {
    Validator::default().validate_restore(raw)
}

pub fn validate_bulk_import(raw: &Value) -> Result<BulkImportDto, ValidationErrors> {
    Validator::default().validate_bulk_import(raw)
}

pub fn validate_send_communication(raw: &Value) -> Result<SendCommunicationDto, ValidationErrors> {
    Validator::default().validate_send_communication(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ViolationCode, ViolationKind};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_non_object_input() {
        let errors = validate_create(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.len(), 1);
        let violation = errors.iter().next().unwrap();
        assert!(violation.path.is_root());
        assert_eq!(violation.kind, ViolationKind::Structural);
        assert_eq!(violation.code, ViolationCode::ExpectedObject);
    }

    #[test]
    fn test_fixed_clock() {
        let validator =
            Validator::default().at(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        let errors = validator
            .validate_create(&json!({
                "tenantId": "0b6a3f52-96b5-4c52-9a0c-0f5d3c0a5f11",
                "organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2",
                "name": {"firstName": "Ada", "lastName": "Lovelace"},
                "demographics": {"dateOfBirth": "2010-01-01", "gender": "female"}
            }))
            .unwrap_err();
        assert_eq!(
            errors.at("demographics.dateOfBirth").next().unwrap().code,
            ViolationCode::FutureDate
        );
    }

    #[test]
    fn test_from_config_carries_batch_size() {
        let mut config = ContractsConfig::default();
        config.import.max_batch_size = 1;
        let validator = Validator::from_config(&config);
        let errors = validator
            .validate_bulk_import(&json!({"source": "json", "patients": [{}, {}]}))
            .unwrap_err();
        assert_eq!(
            errors.at("patients").next().unwrap().code,
            ViolationCode::TooManyItems
        );
    }
}
