//! Logging and observability
//!
//! Structured `tracing` events with a console layer and an optional rolling
//! JSON file. Violation payloads are never logged; events carry counts,
//! codes and paths only.
//!
//! # Example
//!
//! ```no_run
//! use patient_contracts::logging::init_logging;
//! use patient_contracts::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a rejected request
///
/// # Example
///
/// ```no_run
/// use patient_contracts::log_validation_failed;
/// use patient_contracts::domain::ValidationErrors;
///
/// let errors = ValidationErrors::new();
/// log_validation_failed!("create", &errors);
/// ```
#[macro_export]
macro_rules! log_validation_failed {
    ($contract:expr, $errors:expr) => {
        tracing::debug!(
            contract = $contract,
            violations = $errors.len(),
            first = ?$errors.iter().next().map(|v| (v.code, v.path.to_string())),
            "Validation failed"
        );
    };
}

/// Log the outcome of a bulk import
///
/// # Example
///
/// ```no_run
/// use patient_contracts::log_import_summary;
/// use patient_contracts::core::import::ImportSummary;
///
/// let summary = ImportSummary::default();
/// log_import_summary!(&summary);
/// ```
#[macro_export]
macro_rules! log_import_summary {
    ($summary:expr) => {
        tracing::info!(
            total = $summary.total,
            invalid = $summary.invalid,
            created = $summary.created,
            updated = $summary.updated,
            skipped = $summary.skipped,
            conflicts = $summary.conflicts,
            duration_ms = $summary.duration.as_millis(),
            "Import completed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{FieldPath, ValidationErrors, Violation, ViolationCode};

    #[test]
    fn test_validation_macro_expands() {
        let errors: ValidationErrors = Violation::new(
            FieldPath::root().key("name"),
            ViolationCode::MissingField,
            "'name' is required",
        )
        .into();
        log_validation_failed!("patient", &errors);
    }
}
