use thiserror::Error;

use stripmarket_core::{Classify, DomainError, ErrorClass, PartnerId};
use stripmarket_store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("partner {0} not found")]
    NotFound(PartnerId),

    #[error("document store error: {0}")]
    Remote(#[from] StoreError),
}

impl Classify for RegistryError {
    fn class(&self) -> ErrorClass {
        match self {
            RegistryError::Remote(e) => e.class(),
            RegistryError::Invalid(_) | RegistryError::NotFound(_) => ErrorClass::Validation,
        }
    }
}
