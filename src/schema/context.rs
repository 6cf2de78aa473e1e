//! Validation context
//!
//! One [`ValidationContext`] lives for one validation pass. It carries the
//! policy options, the reference clock used by "not in the future" rules, and
//! the violation accumulator every parser writes into.

use crate::domain::{FieldPath, ValidationErrors, Violation, ViolationCode};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What to do with a non-empty contact sequence where nothing is marked primary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplicitPrimaryPolicy {
    /// Leave the flags as supplied; consumers treat the first element as primary
    #[default]
    Preserve,
    /// Mark the first element primary during normalization
    PromoteFirst,
}

/// How to treat a consent with `granted = false` and no revocation details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentRevocationPolicy {
    /// Accept silently
    Ignore,
    /// Accept and emit a warning event
    #[default]
    Warn,
    /// Reject with an invariant violation
    Enforce,
}

/// Default cap on the number of records in one bulk import request
pub const DEFAULT_MAX_IMPORT_BATCH: usize = 1000;

/// Policy switches for a validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub implicit_primary: ImplicitPrimaryPolicy,
    pub consent_revocation: ConsentRevocationPolicy,
    pub max_import_batch: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            implicit_primary: ImplicitPrimaryPolicy::default(),
            consent_revocation: ConsentRevocationPolicy::default(),
            max_import_batch: DEFAULT_MAX_IMPORT_BATCH,
        }
    }
}

/// Per-pass state threaded through every parser and refinement
#[derive(Debug)]
pub struct ValidationContext {
    options: ValidationOptions,
    now: DateTime<Utc>,
    errors: ValidationErrors,
}

impl ValidationContext {
    /// Creates a context evaluating time-relative rules against `now`
    pub fn new(options: ValidationOptions, now: DateTime<Utc>) -> Self {
        Self {
            options,
            now,
            errors: ValidationErrors::new(),
        }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Records a violation at `path`
    pub fn report(&mut self, path: &FieldPath, code: ViolationCode, message: impl Into<String>) {
        self.errors.push(Violation::new(path.clone(), code, message));
    }

    /// Number of violations recorded so far
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Ends the pass
    ///
    /// Returns the value only when no violation was recorded. A missing value
    /// with an empty accumulator means a builder bailed out without reporting,
    /// which is surfaced as a structural `Incomplete` violation.
    pub fn finish<T>(mut self, value: Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        match value {
            Some(value) => Ok(value),
            None => {
                self.report(
                    &FieldPath::root(),
                    ViolationCode::Incomplete,
                    "input could not be normalized",
                );
                Err(self.errors)
            }
        }
    }

    /// Ends the pass, returning whatever was reported
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ValidationOptions::default();
        assert_eq!(options.implicit_primary, ImplicitPrimaryPolicy::Preserve);
        assert_eq!(options.consent_revocation, ConsentRevocationPolicy::Warn);
        assert_eq!(options.max_import_batch, 1000);
    }

    #[test]
    fn test_finish_with_errors() {
        let mut cx = ValidationContext::new(ValidationOptions::default(), Utc::now());
        cx.report(
            &FieldPath::root().key("page"),
            ViolationCode::OutOfRange,
            "page must be at least 1",
        );
        let result = cx.finish(Some(1));
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_finish_without_value_reports_incomplete() {
        let cx = ValidationContext::new(ValidationOptions::default(), Utc::now());
        let errors = cx.finish::<u32>(None).unwrap_err();
        assert!(errors.has_code(ViolationCode::Incomplete));
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: ImplicitPrimaryPolicy = serde_json::from_str("\"promote_first\"").unwrap();
        assert_eq!(policy, ImplicitPrimaryPolicy::PromoteFirst);
        let policy: ConsentRevocationPolicy = serde_json::from_str("\"enforce\"").unwrap();
        assert_eq!(policy, ConsentRevocationPolicy::Enforce);
    }
}
