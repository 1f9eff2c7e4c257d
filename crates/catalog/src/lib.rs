//! Product catalog and category directory.
//!
//! Product identity (barcode, category, description, image reference) lives
//! here; the per-partner price grids nested under each product are owned by
//! `stripmarket-pricing`.

pub mod category;
pub mod error;
pub mod product;

pub use category::CategoryDirectory;
pub use error::CatalogError;
pub use product::{CreateProduct, Product, ProductCatalog, ProductSummary};
