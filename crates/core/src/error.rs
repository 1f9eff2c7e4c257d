//! Domain error model.

use thiserror::Error;

/// How a failure should be handled at the operation boundary.
///
/// - `Parse`: malformed input; reads recover locally with a safe default
///   (zero or "N/A"), only caller-supplied input surfaces as an error.
/// - `Validation`: rejected before any write is attempted; no state changed.
/// - `Remote`: the document store failed; local optimistic state may diverge
///   from the remote document until the next reload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Parse,
    Validation,
    Remote,
}

/// Errors that can be sorted into an [`ErrorClass`].
pub trait Classify {
    fn class(&self) -> ErrorClass;

    fn is_remote(&self) -> bool {
        self.class() == ErrorClass::Remote
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// malformed identifiers). Store failures belong to the store crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank description).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (blank, or unusable as a document key).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

impl Classify for DomainError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}
