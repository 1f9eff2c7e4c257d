//! `stripmarket-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no store access): the typed
//! keys used in the document tree, the entity trait and the error taxonomy.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{Classify, DomainError, ErrorClass};
pub use id::{Barcode, CategoryName, PartnerId, PartnerKey, check_key, validate_key};
