//! Collaborators around the contract layer
//!
//! - [`traits`] - async traits for persistence, delivery, export and audit
//! - [`memory`] - in-memory [`PatientStore`] for dry runs and tests
//! - [`audit`] - JSON-lines and tracing audit sinks
//! - [`export`] - JSON export generator
//!
//! Production deployments supply their own implementations of the traits;
//! the contract layer depends on nothing else.
//!
//! ```rust,no_run
//! use patient_contracts::adapters::{MemoryPatientStore, PatientStore};
//! use patient_contracts::domain::{PatientId, TenantId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryPatientStore::new();
//! let missing = store.get(TenantId::generate(), PatientId::generate()).await;
//! assert!(missing.is_err());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod export;
pub mod memory;
pub mod traits;

pub use audit::{FileAuditLog, TracingAuditLog};
pub use export::JsonExportGenerator;
pub use memory::MemoryPatientStore;
pub use traits::{
    AuditAction, AuditEvent, AuditLog, CommunicationSender, DeliveryReceipt, ExportGenerator,
    PatientStore, StoreResult,
};
