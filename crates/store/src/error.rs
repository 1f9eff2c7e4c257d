use thiserror::Error;

use stripmarket_core::{Classify, ErrorClass};

/// Document store operation error.
///
/// These are **infrastructure errors** (availability, permissions, addressing)
/// as opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (network down, client offline).
    #[error("document store unavailable")]
    Unavailable,

    /// The store rejected the operation for this path.
    #[error("permission denied at '{0}'")]
    PermissionDenied(String),

    /// A path segment is not usable as a document key.
    #[error("invalid document path: {0}")]
    InvalidPath(String),

    /// Internal lock poisoning (in-process stores only).
    #[error("document store lock poisoned")]
    Poisoned,
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            StoreError::InvalidPath(_) => ErrorClass::Validation,
            StoreError::Unavailable | StoreError::PermissionDenied(_) | StoreError::Poisoned => {
                ErrorClass::Remote
            }
        }
    }
}
