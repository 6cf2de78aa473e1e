//! Patient anonymization
//!
//! Applies a validated anonymize request to a canonical record. Two
//! replacement strategies are available:
//!
//! - **redact**: fixed `[REDACTED]` markers
//! - **token**: stable SHA-256 tokens keyed by patient id and field, so
//!   anonymized datasets can still be joined per patient
//!
//! # Usage
//!
//! ```rust,no_run
//! use patient_contracts::anonymization::Anonymizer;
//! use patient_contracts::Validator;
//!
//! # fn example(raw_patient: serde_json::Value, raw_request: serde_json::Value)
//! #     -> patient_contracts::domain::Result<()> {
//! let validator = Validator::default();
//! let patient = validator.validate_patient(&raw_patient)?;
//! let request = validator.validate_anonymize(&raw_request)?;
//! let anonymized = Anonymizer::apply(&validator, &patient, &request)?;
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;

pub use anonymizer::Anonymizer;
