//! Domain types shared by every layer.
//!
//! # Overview
//!
//! - **Strongly-typed identifiers** ([`PatientId`], [`TenantId`], [`OrganizationId`], ...)
//! - **Field paths** ([`FieldPath`]) locating a value in an input document
//! - **Violations** ([`Violation`], [`ValidationErrors`]) with the four-class taxonomy
//! - **Error types** ([`ContractError`], [`StoreError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! Validation never stops at the first problem. Every violation of one pass is
//! collected into [`ValidationErrors`], which converts into [`ContractError`]
//! with `?`:
//!
//! ```rust
//! use patient_contracts::domain::{ContractError, Result};
//! use patient_contracts::Validator;
//!
//! fn example(raw: &serde_json::Value) -> Result<()> {
//!     let patient = Validator::default().validate_patient(raw)?;
//!     println!("{}", patient.patient_number);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod path;
pub mod result;
pub mod violation;

// Re-export commonly used types for convenience
pub use errors::{ContractError, StoreError};
pub use ids::{ClinicId, OrganizationId, PatientId, ProviderId, TenantId};
pub use path::{FieldPath, Segment};
pub use result::Result;
pub use violation::{ValidationErrors, Violation, ViolationCode, ViolationKind};
