//! Operation request contracts
//!
//! Create and update are projections of the canonical patient field table;
//! query and the operation DTOs are flat shapes of their own. Export and bulk
//! import reuse the query and create projections for their nested parts.

pub mod anonymize;
pub mod communication;
pub mod create;
pub mod export;
pub mod import;
pub mod lifecycle;
pub mod merge;
pub mod query;
pub mod update;

pub use anonymize::AnonymizePatientDto;
pub use communication::{Recipient, SendCommunicationDto};
pub use create::CreatePatientDto;
pub use export::ExportPatientsDto;
pub use import::{
    BulkImportDto, DuplicatePolicy, ImportEnvelope, ImportFailure, ImportFlags, ImportItem,
    ImportMode,
};
pub use lifecycle::{ArchivePatientDto, RestorePatientDto};
pub use merge::{ConflictResolution, MergePatientsDto};
pub use query::{BirthDateRange, QueryPatientsDto};
pub use update::{PatientPatch, UpdatePatientDto};
