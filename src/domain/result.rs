//! Result type alias
//!
//! Convenience alias using [`ContractError`] as the error type.

use super::errors::ContractError;

/// Result type alias for crate operations
///
/// # Examples
///
/// ```
/// use patient_contracts::domain::result::Result;
/// use patient_contracts::domain::errors::ContractError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ContractError::Other("unavailable".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ContractError>;
