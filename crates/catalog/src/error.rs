use thiserror::Error;

use stripmarket_core::{Barcode, CategoryName, Classify, DomainError, ErrorClass};
use stripmarket_store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("a product with barcode {0} already exists")]
    DuplicateBarcode(Barcode),

    #[error("product {0} not found")]
    NotFound(Barcode),

    #[error("category {0} not found")]
    CategoryNotFound(CategoryName),

    #[error("document store error: {0}")]
    Remote(#[from] StoreError),
}

impl Classify for CatalogError {
    fn class(&self) -> ErrorClass {
        match self {
            CatalogError::Remote(e) => e.class(),
            _ => ErrorClass::Validation,
        }
    }
}
