//! Validation and normalization pipeline
//!
//! Raw JSON flows leaf-first through this module:
//!
//! - [`primitives`] and [`enums`]: scalar atoms with format constraints
//! - [`values`], [`contact`], [`medical`], [`insurance`], [`preferences`],
//!   [`consent`]: value objects with their defaults and local rules
//! - [`collections`]: rules across a sequence (single primary, dedupe)
//! - [`patient`]: the canonical root record and its entity rules
//! - [`shape`]: the field-table combinators the DTO projections are built from
//!
//! Every parser writes violations into a shared [`ValidationContext`] and
//! keeps going, so one pass reports every problem in the input.

pub mod collections;
pub mod consent;
pub mod contact;
pub mod context;
pub mod enums;
pub mod fields;
pub mod insurance;
pub mod medical;
pub mod node;
pub mod patient;
pub mod preferences;
pub mod primitives;
pub mod shape;
pub mod values;

pub use collections::{effective_primary, Primary};
pub use consent::ConsentRecord;
pub use contact::{EmailContact, EmergencyContact, PatientContacts, PhoneContact, PhysicalAddress};
pub use context::{
    ConsentRevocationPolicy, ImplicitPrimaryPolicy, ValidationContext, ValidationOptions,
};
pub use enums::*;
pub use fields::Nullable;
pub use insurance::{InsuranceCoverage, PatientInsurance};
pub use medical::{Alert, Allergy, Condition, MedicalFlags, Medication};
pub use node::Schema;
pub use patient::{AuditStamp, Patient, PatientRecord, PATIENT_FIELDS};
pub use preferences::{CommunicationPreferences, ContactTimeWindow};
pub use shape::{FieldSpec, Presence, Shape};
pub use values::{Demographics, PersonName};
