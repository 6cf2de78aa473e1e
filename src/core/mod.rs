//! Core operations over the contracts
//!
//! # Modules
//!
//! - [`validator`] - Entry points: one call per contract, all violations returned
//! - [`lifecycle`] - Update, archive, restore and merge transitions on stored records
//! - [`import`] - Concurrent bulk validation, duplicate planning and application
//!
//! # Import Workflow
//!
//! 1. **Validate**: Envelope first, then each element independently
//! 2. **Deduplicate**: In-batch repeats become `DuplicateEntry` failures
//! 3. **Plan**: Match accepted elements against the store
//! 4. **Apply**: Create or update through the store (skipped for dry runs)
//! 5. **Report**: [`import::ImportSummary`] with counts and per-element failures
//!
//! # Example
//!
//! ```rust,no_run
//! use patient_contracts::adapters::MemoryPatientStore;
//! use patient_contracts::core::import::{run_import, validate_concurrently};
//! use patient_contracts::Validator;
//!
//! # async fn example(raw: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let validator = Validator::default();
//! let store = MemoryPatientStore::new();
//!
//! let request = validate_concurrently(&validator, &raw, 4).await?;
//! let summary = run_import(&validator, &store, request, "importer").await?;
//!
//! println!("Created: {}", summary.created);
//! println!("Invalid: {}", summary.invalid);
//! # Ok(())
//! # }
//! ```

pub mod import;
pub mod lifecycle;
pub mod validator;

pub use validator::Validator;
