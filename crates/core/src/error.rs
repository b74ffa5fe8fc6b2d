//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures that are detected *before* any
/// state changes (validation, parsing, uniqueness). Storage failures belong to
/// the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank code or name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An item with this code already exists in the collection.
    #[error("item with code '{0}' already exists")]
    DuplicateCode(String),

    /// User-typed quantity is not a valid integer.
    #[error("invalid quantity '{0}'")]
    ParseFailure(String),

    /// An import produced zero usable rows after filtering.
    #[error("nothing to import: no rows with a recognisable item code")]
    ImportEmpty,

    /// No item carries the requested code.
    #[error("no item with code '{0}'")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode(code.into())
    }

    pub fn parse_failure(input: impl Into<String>) -> Self {
        Self::ParseFailure(input.into())
    }

    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound(code.into())
    }
}
