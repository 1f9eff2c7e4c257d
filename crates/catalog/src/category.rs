//! Category list and per-category date anchors.
//!
//! Categories are stored as keys of a flat node (`categories/{name}: true`).
//! Anchors are `M/d/yyyy` strings keyed by category name; older clients wrote
//! both keys and values with stray whitespace, so lookups match trimmed text.

use std::collections::BTreeMap;

use serde_json::Value;

use stripmarket_core::CategoryName;
use stripmarket_store::document::child_keys;
use stripmarket_store::{DocumentStore, StoreLayout};

use crate::error::CatalogError;

#[derive(Debug)]
pub struct CategoryDirectory<S> {
    store: S,
    layout: StoreLayout,
}

impl<S> CategoryDirectory<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, layout: StoreLayout) -> Self {
        Self { store, layout }
    }

    /// Category names in store order.
    pub fn list(&self) -> Result<Vec<CategoryName>, CatalogError> {
        let snapshot = self.store.get(&self.layout.categories_path()?)?;
        Ok(child_keys(snapshot.value.as_ref())
            .into_iter()
            .filter_map(|k| CategoryName::new(k).ok())
            .collect())
    }

    /// Add a category. Adding an existing name is a no-op write.
    pub fn add(&self, name: &str) -> Result<CategoryName, CatalogError> {
        let name = CategoryName::new(name)?;
        let path = self.layout.categories_path()?.child(&name)?;
        self.store.set(&path, Value::Bool(true))?;
        tracing::info!(category = %name, "category added");
        Ok(name)
    }

    /// Remove a category from the list. Products referencing it keep the name.
    pub fn remove(&self, name: &CategoryName) -> Result<(), CatalogError> {
        let path = self.layout.categories_path()?.child(name)?;
        if !self.store.get(&path)?.exists() {
            return Err(CatalogError::CategoryNotFound(name.clone()));
        }
        self.store.remove(&path)?;
        tracing::info!(category = %name, "category removed");
        Ok(())
    }

    /// Raw anchor date text for a category, trimmed. `None` when missing.
    pub fn anchor(&self, category: &CategoryName) -> Result<Option<String>, CatalogError> {
        let snapshot = self.store.get(&self.layout.category_anchors_path()?)?;
        let Some(Value::Object(anchors)) = snapshot.value else {
            return Ok(None);
        };

        let anchor = anchors
            .iter()
            .find(|(key, _)| key.trim() == category.as_str())
            .and_then(|(_, value)| anchor_text(value));
        Ok(anchor)
    }

    /// Every anchor, keyed by trimmed category name.
    pub fn anchors(&self) -> Result<BTreeMap<String, String>, CatalogError> {
        let snapshot = self.store.get(&self.layout.category_anchors_path()?)?;
        let Some(Value::Object(anchors)) = snapshot.value else {
            return Ok(BTreeMap::new());
        };

        Ok(anchors
            .iter()
            .filter_map(|(key, value)| Some((key.trim().to_string(), anchor_text(value)?)))
            .collect())
    }
}

fn anchor_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use stripmarket_store::{DocumentPath, InMemoryDocumentStore};

    fn directory(layout: StoreLayout) -> (Arc<InMemoryDocumentStore>, CategoryDirectory<Arc<InMemoryDocumentStore>>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        (store.clone(), CategoryDirectory::new(store, layout))
    }

    #[test]
    fn add_list_remove() {
        let (_store, dir) = directory(StoreLayout::default());
        dir.add(" Test Strips ").unwrap();
        dir.add("Devices").unwrap();
        dir.add("Test Strips").unwrap();

        let names: Vec<_> = dir.list().unwrap().into_iter().map(String::from).collect();
        assert_eq!(names, vec!["Test Strips", "Devices"]);

        let devices = CategoryName::new("Devices").unwrap();
        dir.remove(&devices).unwrap();
        assert!(matches!(dir.remove(&devices), Err(CatalogError::CategoryNotFound(_))));
        assert_eq!(dir.list().unwrap().len(), 1);
    }

    #[test]
    fn blank_category_is_rejected() {
        let (store, dir) = directory(StoreLayout::default());
        assert!(matches!(dir.add("   "), Err(CatalogError::Invalid(_))));
        assert_eq!(store.revision().get(), 0);
    }

    #[test]
    fn anchors_match_trimmed_keys_and_values() {
        let (store, dir) = directory(StoreLayout::legacy());
        store
            .set(
                &DocumentPath::new("last updated").unwrap(),
                json!({"Test Strips ": " 1/15/2025 ", "Devices": 7}),
            )
            .unwrap();

        let strips = CategoryName::new("Test Strips").unwrap();
        assert_eq!(dir.anchor(&strips).unwrap().as_deref(), Some("1/15/2025"));

        let devices = CategoryName::new("Devices").unwrap();
        assert_eq!(dir.anchor(&devices).unwrap(), None);

        let all = dir.anchors().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["Test Strips"], "1/15/2025");
    }
}
