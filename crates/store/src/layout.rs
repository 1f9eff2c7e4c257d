//! Root keys of a deployment's document tree.

use crate::error::StoreError;
use crate::path::DocumentPath;

/// Names of the top-level nodes the marketplace reads and writes.
///
/// `Default` is the canonical layout:
///
/// ```text
/// products/{barcode}/category|description|imageUrl
/// products/{barcode}/prices/{partnerKey}/price1..price10
/// partners/{partnerId}/name          (buyers)
/// wholesalers/{partnerId}/name
/// categories/{category}: true
/// categoryLastUpdated/{category}: "M/d/yyyy"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub products: String,
    pub buyers: String,
    pub wholesalers: String,
    pub categories: String,
    pub category_anchors: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            products: "products".to_string(),
            buyers: "partners".to_string(),
            wholesalers: "wholesalers".to_string(),
            categories: "categories".to_string(),
            category_anchors: "categoryLastUpdated".to_string(),
        }
    }
}

impl StoreLayout {
    /// Layout used by the deployed mobile client.
    pub fn legacy() -> Self {
        Self {
            buyers: "buyers".to_string(),
            category_anchors: "last updated".to_string(),
            ..Self::default()
        }
    }

    /// Default layout with per-root overrides from the environment
    /// (`STRIPMARKET_PRODUCTS_ROOT`, `STRIPMARKET_BUYERS_ROOT`,
    /// `STRIPMARKET_WHOLESALERS_ROOT`, `STRIPMARKET_CATEGORIES_ROOT`,
    /// `STRIPMARKET_ANCHORS_ROOT`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let layout = Self {
            products: env_or("STRIPMARKET_PRODUCTS_ROOT", defaults.products),
            buyers: env_or("STRIPMARKET_BUYERS_ROOT", defaults.buyers),
            wholesalers: env_or("STRIPMARKET_WHOLESALERS_ROOT", defaults.wholesalers),
            categories: env_or("STRIPMARKET_CATEGORIES_ROOT", defaults.categories),
            category_anchors: env_or("STRIPMARKET_ANCHORS_ROOT", defaults.category_anchors),
        };
        tracing::debug!(?layout, "resolved store layout");
        layout
    }

    /// Check that every root is a usable key.
    pub fn validate(&self) -> Result<(), StoreError> {
        for root in [
            &self.products,
            &self.buyers,
            &self.wholesalers,
            &self.categories,
            &self.category_anchors,
        ] {
            DocumentPath::root().child(root)?;
        }
        Ok(())
    }

    pub fn products_path(&self) -> Result<DocumentPath, StoreError> {
        DocumentPath::root().child(&self.products)
    }

    pub fn product_path(&self, barcode: impl AsRef<str>) -> Result<DocumentPath, StoreError> {
        self.products_path()?.child(barcode)
    }

    pub fn buyers_path(&self) -> Result<DocumentPath, StoreError> {
        DocumentPath::root().child(&self.buyers)
    }

    pub fn wholesalers_path(&self) -> Result<DocumentPath, StoreError> {
        DocumentPath::root().child(&self.wholesalers)
    }

    pub fn categories_path(&self) -> Result<DocumentPath, StoreError> {
        DocumentPath::root().child(&self.categories)
    }

    pub fn category_anchors_path(&self) -> Result<DocumentPath, StoreError> {
        DocumentPath::root().child(&self.category_anchors)
    }
}

fn env_or(var: &str, default: String) -> String {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default,
    }
}
