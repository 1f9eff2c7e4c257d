use serde::Serialize;
use serde_json::{Value, json};

use stripmarket_core::{Barcode, CategoryName, DomainError, Entity, PartnerKey};
use stripmarket_store::document::{child_keys, string_field};
use stripmarket_store::{DocumentStore, StoreLayout};

use crate::error::CatalogError;

/// Child key holding a product's price grids.
pub const PRICES_KEY: &str = "prices";

/// Product document as read from `products/{barcode}`.
///
/// Category and partner references are plain strings embedded in the document;
/// renaming a category or partner elsewhere does not touch them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    barcode: Barcode,
    category: Option<CategoryName>,
    description: String,
    image_url: Option<String>,
    partner_keys: Vec<PartnerKey>,
}

impl Product {
    /// Read a product document permissively (missing fields read as empty).
    pub fn from_document(barcode: Barcode, doc: Option<&Value>) -> Self {
        let category = string_field(doc, "category").and_then(|c| CategoryName::new(c).ok());
        let description = string_field(doc, "description").unwrap_or_default();
        let image_url = string_field(doc, "imageUrl").filter(|u| !u.trim().is_empty());
        let partner_keys = child_keys(doc.and_then(|d| d.get(PRICES_KEY)))
            .into_iter()
            .filter_map(|k| PartnerKey::stored(k).ok())
            .collect();

        Self {
            barcode,
            category,
            description,
            image_url,
            partner_keys,
        }
    }

    pub fn barcode(&self) -> &Barcode {
        &self.barcode
    }

    pub fn category(&self) -> Option<&CategoryName> {
        self.category.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Partners with a price grid on this product, in store order.
    pub fn partner_keys(&self) -> &[PartnerKey] {
        &self.partner_keys
    }

    /// Record a partner whose grid has just been created (no-op if known).
    pub fn record_partner(&mut self, key: PartnerKey) {
        if !self.partner_keys.contains(&key) {
            self.partner_keys.push(key);
        }
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            barcode: self.barcode.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            partner_count: self.partner_keys.len(),
        }
    }
}

impl Entity for Product {
    type Id = Barcode;

    fn id(&self) -> &Self::Id {
        &self.barcode
    }
}

/// List entry for product pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub barcode: Barcode,
    pub category: Option<CategoryName>,
    pub description: String,
    pub image_url: Option<String>,
    pub partner_count: usize,
}

/// Command: create a product (raw form input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProduct {
    pub barcode: String,
    pub category: String,
    pub description: String,
}

impl CreateProduct {
    fn validate(&self) -> Result<(Barcode, CategoryName, String), DomainError> {
        let barcode = Barcode::new(&self.barcode)?;
        let category = CategoryName::new(&self.category)
            .map_err(|_| DomainError::validation("please select a category"))?;
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be blank"));
        }
        Ok((barcode, category, self.description.clone()))
    }
}

/// CRUD over product identity.
#[derive(Debug)]
pub struct ProductCatalog<S> {
    store: S,
    layout: StoreLayout,
}

impl<S> ProductCatalog<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, layout: StoreLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// All products, in store order.
    pub fn list(&self) -> Result<Vec<ProductSummary>, CatalogError> {
        Ok(self.products()?.iter().map(Product::summary).collect())
    }

    pub fn get(&self, barcode: &Barcode) -> Result<Product, CatalogError> {
        let snapshot = self.store.get(&self.layout.product_path(barcode)?)?;
        if !snapshot.exists() {
            return Err(CatalogError::NotFound(barcode.clone()));
        }
        Ok(Product::from_document(barcode.clone(), snapshot.value.as_ref()))
    }

    pub fn exists(&self, barcode: &Barcode) -> Result<bool, CatalogError> {
        Ok(self.store.get(&self.layout.product_path(barcode)?)?.exists())
    }

    /// Create a product with an empty price grid.
    ///
    /// The existence check and the write are separate requests; two clients
    /// racing on the same barcode both pass the check and the later write wins.
    pub fn create(&self, cmd: CreateProduct) -> Result<Product, CatalogError> {
        let (barcode, category, description) = cmd.validate()?;

        if self.exists(&barcode)? {
            return Err(CatalogError::DuplicateBarcode(barcode));
        }

        let path = self.layout.product_path(&barcode)?;
        let revision = self.store.set(
            &path,
            json!({
                "category": category.as_str(),
                "description": description,
            }),
        )?;
        tracing::info!(barcode = %barcode, category = %category, revision = revision.get(), "product created");

        Ok(Product {
            barcode,
            category: Some(category),
            description,
            image_url: None,
            partner_keys: Vec::new(),
        })
    }

    /// Delete a product together with every partner grid nested under it.
    pub fn delete(&self, barcode: &Barcode) -> Result<(), CatalogError> {
        if !self.exists(barcode)? {
            return Err(CatalogError::NotFound(barcode.clone()));
        }
        let revision = self.store.remove(&self.layout.product_path(barcode)?)?;
        tracing::info!(barcode = %barcode, revision = revision.get(), "product deleted");
        Ok(())
    }

    /// Point a product at an already-uploaded image.
    pub fn attach_image(&self, barcode: &Barcode, url: &str) -> Result<(), CatalogError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DomainError::validation("image url cannot be blank").into());
        }
        if !self.exists(barcode)? {
            return Err(CatalogError::NotFound(barcode.clone()));
        }
        let path = self.layout.product_path(barcode)?.child("imageUrl")?;
        self.store.set(&path, Value::String(url.to_string()))?;
        tracing::debug!(barcode = %barcode, "product image attached");
        Ok(())
    }

    pub fn barcodes(&self) -> Result<Vec<Barcode>, CatalogError> {
        let snapshot = self.store.get(&self.layout.products_path()?)?;
        Ok(child_keys(snapshot.value.as_ref())
            .into_iter()
            .filter_map(|k| Barcode::new(k).ok())
            .collect())
    }

    /// Categories referenced by at least one product (first-seen order).
    pub fn categories_in_use(&self) -> Result<Vec<CategoryName>, CatalogError> {
        let mut out: Vec<CategoryName> = Vec::new();
        for product in self.products()? {
            if let Some(category) = product.category {
                if !out.contains(&category) {
                    out.push(category);
                }
            }
        }
        Ok(out)
    }

    /// Partner keys referenced by at least one product grid (first-seen order).
    pub fn partner_keys_in_use(&self) -> Result<Vec<PartnerKey>, CatalogError> {
        let mut out: Vec<PartnerKey> = Vec::new();
        for product in self.products()? {
            for key in product.partner_keys {
                if !out.contains(&key) {
                    out.push(key);
                }
            }
        }
        Ok(out)
    }

    fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let snapshot = self.store.get(&self.layout.products_path()?)?;
        let Some(Value::Object(products)) = snapshot.value else {
            return Ok(Vec::new());
        };

        Ok(products
            .iter()
            .filter_map(|(key, doc)| {
                let barcode = Barcode::new(key).ok()?;
                Some(Product::from_document(barcode, Some(doc)))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stripmarket_store::{DocumentPath, InMemoryDocumentStore, StoreError};

    fn catalog() -> (Arc<InMemoryDocumentStore>, ProductCatalog<Arc<InMemoryDocumentStore>>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let catalog = ProductCatalog::new(store.clone(), StoreLayout::default());
        (store, catalog)
    }

    fn create(barcode: &str, category: &str, description: &str) -> CreateProduct {
        CreateProduct {
            barcode: barcode.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        }
    }

    fn path(p: &str) -> DocumentPath {
        DocumentPath::new(p).unwrap()
    }

    #[test]
    fn create_writes_identity_with_empty_grid() {
        let (store, catalog) = catalog();
        let product = catalog.create(create("012345", "Test Strips", "Brand X 50ct ")).unwrap();

        assert_eq!(product.description(), "Brand X 50ct ");
        assert!(product.partner_keys().is_empty());

        let doc = store.get(&path("products/012345")).unwrap().value.unwrap();
        assert_eq!(doc, json!({"category": "Test Strips", "description": "Brand X 50ct "}));
    }

    #[test]
    fn stored_partner_keys_are_read_verbatim() {
        let (store, catalog) = catalog();
        store
            .set(
                &path("products/012345"),
                json!({"category": "Test Strips", "description": "d", "prices": {"Acme ": {"price1": 7}, "B": {"price1": 1}}}),
            )
            .unwrap();

        let product = catalog.get(&Barcode::new("012345").unwrap()).unwrap();
        let keys: Vec<&str> = product.partner_keys().iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Acme ", "B"]);
    }

    #[test]
    fn create_rejects_duplicate_barcode_without_writing() {
        let (store, catalog) = catalog();
        catalog.create(create("012345", "Test Strips", "first")).unwrap();
        let before = store.revision();

        let err = catalog.create(create("012345", "Devices", "second")).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateBarcode(b) if b.as_str() == "012345"));
        assert_eq!(store.revision(), before);
        assert_eq!(catalog.get(&Barcode::new("012345").unwrap()).unwrap().description(), "first");
    }

    #[test]
    fn create_validates_form_input() {
        let (store, catalog) = catalog();
        assert!(matches!(
            catalog.create(create(" ", "Test Strips", "x")),
            Err(CatalogError::Invalid(DomainError::InvalidId(_)))
        ));
        assert!(matches!(
            catalog.create(create("1", "", "x")),
            Err(CatalogError::Invalid(DomainError::Validation(_)))
        ));
        assert!(matches!(
            catalog.create(create("1", "Test Strips", "   ")),
            Err(CatalogError::Invalid(DomainError::Validation(_)))
        ));
        assert_eq!(store.revision().get(), 0);
    }

    #[test]
    fn delete_removes_product_and_nested_grids() {
        let (store, catalog) = catalog();
        catalog.create(create("012345", "Test Strips", "x")).unwrap();
        store.set(&path("products/012345/prices/A/price1"), json!(9)).unwrap();

        let barcode = Barcode::new("012345").unwrap();
        catalog.delete(&barcode).unwrap();

        assert!(!store.get(&path("products/012345/prices/A")).unwrap().exists());
        assert!(matches!(catalog.get(&barcode), Err(CatalogError::NotFound(_))));
        assert!(matches!(catalog.delete(&barcode), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn list_reads_documents_permissively() {
        let (store, catalog) = catalog();
        store
            .set(
                &path("products"),
                json!({
                    "111": {"category": "Test Strips", "description": "A", "prices": {"p1": {"price1": 1}, "p2": {}}},
                    "222": {"description": 42},
                }),
            )
            .unwrap();

        let list = catalog.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].barcode.as_str(), "111");
        assert_eq!(list[0].partner_count, 1);
        assert_eq!(list[1].category, None);
        assert_eq!(list[1].description, "");
    }

    #[test]
    fn references_are_enumerated_from_documents() {
        let (store, catalog) = catalog();
        store
            .set(
                &path("products"),
                json!({
                    "1": {"category": "Test Strips", "description": "a", "prices": {"A": {"price1": 1}}},
                    "2": {"category": "Devices", "description": "b", "prices": {"B": {"price1": 1}, "A": {"price2": 3}}},
                    "3": {"category": "Test Strips", "description": "c"},
                }),
            )
            .unwrap();

        let categories: Vec<_> = catalog.categories_in_use().unwrap().into_iter().map(String::from).collect();
        assert_eq!(categories, vec!["Test Strips", "Devices"]);

        let partners: Vec<_> = catalog.partner_keys_in_use().unwrap().into_iter().map(String::from).collect();
        assert_eq!(partners, vec!["A", "B"]);

        let barcodes: Vec<_> = catalog.barcodes().unwrap().into_iter().map(String::from).collect();
        assert_eq!(barcodes, vec!["1", "2", "3"]);
    }

    #[test]
    fn attach_image_sets_reference() {
        let (_store, catalog) = catalog();
        catalog.create(create("9", "Devices", "meter")).unwrap();
        let barcode = Barcode::new("9").unwrap();

        catalog.attach_image(&barcode, "https://cdn.example/9.jpg").unwrap();
        assert_eq!(catalog.get(&barcode).unwrap().image_url(), Some("https://cdn.example/9.jpg"));

        let missing = Barcode::new("10").unwrap();
        assert!(matches!(catalog.attach_image(&missing, "u"), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn remote_failures_surface_as_remote_errors() {
        let (store, catalog) = catalog();
        store.set_available(false);
        let err = catalog.create(create("1", "Devices", "x")).unwrap_err();
        assert_eq!(err, CatalogError::Remote(StoreError::Unavailable));
        assert!(stripmarket_core::Classify::is_remote(&err));
    }
}
