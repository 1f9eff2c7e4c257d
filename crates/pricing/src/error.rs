use thiserror::Error;

use stripmarket_catalog::CatalogError;
use stripmarket_core::{Barcode, Classify, DomainError, ErrorClass, PartnerKey};
use stripmarket_partners::RegistryError;
use stripmarket_store::StoreError;

use crate::grid::PRICE_SLOTS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceGridError {
    #[error("price slot {0} is out of range 1..={max}", max = PRICE_SLOTS)]
    InvalidSlot(usize),

    #[error("'{0}' is not a non-negative whole price")]
    InvalidValue(String),

    #[error("partner {0} has no price grid on this product")]
    InvalidPartner(PartnerKey),

    #[error("partner {0} already has a price grid on this product")]
    DuplicatePartner(PartnerKey),

    #[error("product {0} has no partner to edit prices for")]
    NoActivePartner(Barcode),

    #[error("product {0} not found")]
    NotFound(Barcode),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("document store error: {0}")]
    Remote(#[from] StoreError),
}

impl Classify for PriceGridError {
    fn class(&self) -> ErrorClass {
        match self {
            PriceGridError::InvalidValue(_) => ErrorClass::Parse,
            PriceGridError::Remote(e) => e.class(),
            PriceGridError::InvalidSlot(_)
            | PriceGridError::InvalidPartner(_)
            | PriceGridError::DuplicatePartner(_)
            | PriceGridError::NoActivePartner(_)
            | PriceGridError::NotFound(_)
            | PriceGridError::Invalid(_) => ErrorClass::Validation,
        }
    }
}

/// Failure of one of the coordinator's edit flows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceEditError {
    #[error("please select a partner")]
    BlankPartner,

    #[error("'{name}' matches {matches} registered partners")]
    AmbiguousPartner { name: String, matches: usize },

    #[error("'{0}' is not a registered partner")]
    UnregisteredPartner(String),

    #[error(transparent)]
    Grid(#[from] PriceGridError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<DomainError> for PriceEditError {
    fn from(value: DomainError) -> Self {
        PriceEditError::Grid(PriceGridError::Invalid(value))
    }
}

impl From<StoreError> for PriceEditError {
    fn from(value: StoreError) -> Self {
        PriceEditError::Grid(PriceGridError::Remote(value))
    }
}

impl Classify for PriceEditError {
    fn class(&self) -> ErrorClass {
        match self {
            PriceEditError::BlankPartner
            | PriceEditError::AmbiguousPartner { .. }
            | PriceEditError::UnregisteredPartner(_) => ErrorClass::Validation,
            PriceEditError::Grid(e) => e.class(),
            PriceEditError::Registry(e) => e.class(),
            PriceEditError::Catalog(e) => e.class(),
        }
    }
}
