//! Violation taxonomy and the aggregated error set
//!
//! Every rule the pipeline enforces has a [`ViolationCode`]; the code decides
//! which of the four [`ViolationKind`] classes it belongs to. A validation
//! pass collects all of them into one [`ValidationErrors`].

use super::path::FieldPath;
use serde::Serialize;
use std::fmt;

/// Violation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// Wrong container type, unknown key, missing required key
    #[serde(rename = "StructuralError")]
    Structural,
    /// Format, length, range, enum membership or scalar type on a present value
    #[serde(rename = "ConstraintError")]
    Constraint,
    /// Cross-field or cross-element rule
    #[serde(rename = "InvariantViolation")]
    Invariant,
    /// Operation-specific literal or precondition
    #[serde(rename = "GuardViolation")]
    Guard,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::Structural => "StructuralError",
            ViolationKind::Constraint => "ConstraintError",
            ViolationKind::Invariant => "InvariantViolation",
            ViolationKind::Guard => "GuardViolation",
        };
        f.write_str(name)
    }
}

/// The specific rule that was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    // Structural
    MissingField,
    UnknownKey,
    ExpectedObject,
    ExpectedArray,
    NullNotAllowed,
    Incomplete,

    // Constraint
    InvalidType,
    TooShort,
    TooLong,
    InvalidFormat,
    InvalidEnumValue,
    OutOfRange,
    FutureDate,
    PastDate,
    TooFewItems,
    TooManyItems,
    UnknownFieldName,

    // Invariant
    DuplicatePrimary,
    InvalidTierOrdering,
    CoverageTypeMismatch,
    DateOrdering,
    ChannelNotEnabled,
    DuplicateEntry,
    IdenticalIdentifiers,
    MissingRevocation,
    ConflictingSelection,
    IncompleteDeletion,
    InvalidRange,

    // Guard
    ConfirmationRequired,
    ScopeRequired,
    SubjectRequired,
    RecipientUnreachable,
    InvalidTransition,
}

impl ViolationCode {
    /// The class this rule belongs to
    pub fn kind(&self) -> ViolationKind {
        use ViolationCode::*;
        match self {
            MissingField | UnknownKey | ExpectedObject | ExpectedArray | NullNotAllowed
            | Incomplete => ViolationKind::Structural,
            InvalidType | TooShort | TooLong | InvalidFormat | InvalidEnumValue | OutOfRange
            | FutureDate | PastDate | TooFewItems | TooManyItems | UnknownFieldName => {
                ViolationKind::Constraint
            }
            DuplicatePrimary | InvalidTierOrdering | CoverageTypeMismatch | DateOrdering
            | ChannelNotEnabled | DuplicateEntry | IdenticalIdentifiers | MissingRevocation
            | ConflictingSelection | IncompleteDeletion | InvalidRange => ViolationKind::Invariant,
            ConfirmationRequired | ScopeRequired | SubjectRequired | RecipientUnreachable
            | InvalidTransition => ViolationKind::Guard,
        }
    }
}

/// A single broken rule at a single location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Where the violation occurred
    pub path: FieldPath,
    /// Violation class
    pub kind: ViolationKind,
    /// Specific rule
    pub code: ViolationCode,
    /// Human-readable explanation
    pub message: String,
}

impl Violation {
    /// Creates a violation; the kind follows from the code
    pub fn new(path: FieldPath, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            path,
            kind: code.kind(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
        }
    }
}

/// All violations found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a violation
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Adds every violation from another set
    pub fn extend(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    /// True if nothing was reported
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Iterates over the violations in report order
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// True if some violation carries `code`
    pub fn has_code(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// True if some violation is of class `kind`
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Violations reported at exactly `path` (rendered form)
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.path.to_string() == path)
    }

    /// Re-roots every violation under `prefix`
    pub fn prefixed(self, prefix: &FieldPath) -> Self {
        Self {
            violations: self
                .violations
                .into_iter()
                .map(|mut v| {
                    v.path = v.path.prefixed(prefix);
                    v
                })
                .collect(),
        }
    }

    /// Consumes the set, returning the violations
    pub fn into_vec(self) -> Vec<Violation> {
        self.violations
    }
}

impl From<Violation> for ValidationErrors {
    fn from(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
