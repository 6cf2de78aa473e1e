// Patient Contracts - Patient record validation and normalization
// Copyright (c) 2025 Patient Contracts Contributors
// Licensed under the MIT License

//! # Patient Contracts
//!
//! Validation, normalization and request contracts for a multi-tenant
//! patient-records service.
//!
//! ## Overview
//!
//! Every payload that crosses the service boundary is raw JSON. This crate
//! turns it into a typed value or a complete list of violations:
//!
//! - **Canonical record**: [`schema::Patient`] with demographics, contacts,
//!   medical information, insurance, preferences and consents
//! - **Operation contracts**: create, update, query, merge, export, anonymize,
//!   archive, restore, bulk import and communication requests in [`dto`]
//! - **Lifecycle**: update, archive, restore and merge transitions in
//!   [`core::lifecycle`], anonymization in [`anonymization`]
//! - **Bulk import**: concurrent validation and duplicate planning in
//!   [`core::import`]
//!
//! ## Architecture
//!
//! - [`schema`] - Field-level parsers, value objects and the canonical record
//! - [`dto`] - Operation request shapes
//! - [`core`] - Validator entry points, lifecycle transitions, bulk import
//! - [`anonymization`] - Irreversible de-identification
//! - [`adapters`] - Store, audit, export and communication seams
//! - [`domain`] - Identifiers, field paths, violations and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`cli`] - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust
//! use patient_contracts::Validator;
//! use serde_json::json;
//!
//! let validator = Validator::default();
//! let query = validator
//!     .validate_query(&json!({"organizationId": "5c8d2f0e-2f0b-4a57-9a6b-41f1f0f3a9e2"}))
//!     .unwrap();
//! assert_eq!(query.page, 1);
//! assert_eq!(query.page_size, 20);
//! ```
//!
//! ## Error Handling
//!
//! Validation returns [`domain::ValidationErrors`], every violation of the
//! pass with its path and code. Everything else fails with
//! [`domain::ContractError`], which a `ValidationErrors` converts into:
//!
//! ```rust,no_run
//! use patient_contracts::domain::Result;
//! use patient_contracts::Validator;
//!
//! fn example(raw: &serde_json::Value) -> Result<()> {
//!     let dto = Validator::default().validate_create(raw)?;
//!     tracing::info!(patient_number = ?dto.patient_number, "Accepted");
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Events go through `tracing`. Field values never appear in log output;
//! rejected payloads are logged by violation count, code and path.

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod dto;
pub mod logging;
pub mod schema;

pub use core::validator::{
    validate_anonymize, validate_archive, validate_bulk_import, validate_create, validate_export,
    validate_merge, validate_patient, validate_query, validate_restore,
    validate_send_communication, validate_update, Validator,
};
