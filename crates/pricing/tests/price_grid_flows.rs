//! End-to-end editing flows against the in-memory document store.

use std::sync::Arc;

use anyhow::Context;
use proptest::prelude::*;
use serde_json::json;

use stripmarket_catalog::{CatalogError, CreateProduct, ProductCatalog};
use stripmarket_core::{Barcode, PartnerKey};
use stripmarket_pricing::{
    CoordinatorConfig, GridStoreConfig, PRICE_SLOTS, PriceEditCoordinator, PriceEditError, PriceGrid,
    PriceGridError, PriceGridStore, labels,
};
use stripmarket_store::{DocumentPath, DocumentStore, InMemoryDocumentStore, StoreLayout};

type Store = Arc<InMemoryDocumentStore>;

fn init_logs() {
    stripmarket_observability::init_for_tests("debug");
}

fn path(p: &str) -> DocumentPath {
    DocumentPath::new(p).unwrap()
}

fn key(k: &str) -> PartnerKey {
    PartnerKey::new(k).unwrap()
}

/// Product "012345" with partners A = 1..=10 and B = all zero.
fn scenario_store() -> Store {
    let store = Arc::new(InMemoryDocumentStore::new());
    let a = PriceGrid::from_cells([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    store
        .set(
            &path("products/012345"),
            json!({
                "category": "Test Strips",
                "description": "Brand X 50ct",
                "prices": {
                    "A": a.to_document(),
                    "B": PriceGrid::zeroed().to_document(),
                },
            }),
        )
        .unwrap();
    store
        .set(&path("categoryLastUpdated/Test Strips"), json!("1/15/2025"))
        .unwrap();
    store
}

fn coordinator(store: &Store) -> PriceEditCoordinator<Store> {
    PriceEditCoordinator::new(
        store.clone(),
        StoreLayout::default(),
        GridStoreConfig::default(),
        CoordinatorConfig::default(),
    )
}

#[test]
fn switch_then_override_touches_only_that_partner() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let coordinator = coordinator(&store);
    let barcode = Barcode::new("012345")?;

    coordinator.select_partner(&barcode, "B").context("switch to B")?;
    let view = coordinator.override_price(&barcode, 3, "250").context("override")?;
    assert_eq!(view.grid.cells(), &[0, 0, 250, 0, 0, 0, 0, 0, 0, 0]);

    // Fresh store reads agree with the cache.
    let b = store.get(&path("products/012345/prices/B"))?;
    assert_eq!(PriceGrid::from_document(b.value.as_ref()).cells(), &[0, 0, 250, 0, 0, 0, 0, 0, 0, 0]);
    let a = store.get(&path("products/012345/prices/A"))?;
    assert_eq!(PriceGrid::from_document(a.value.as_ref()).cells(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

    let view = coordinator.select_partner(&barcode, "A")?;
    assert_eq!(view.grid.cells(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    Ok(())
}

#[test]
fn price_table_uses_category_anchor() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let coordinator = coordinator(&store);
    let barcode = Barcode::new("012345")?;

    let table = coordinator.price_table(&barcode)?;
    let expected = labels(Some("1/15/2025"), PRICE_SLOTS);
    let got: Vec<_> = table.rows.iter().map(|r| r.label.clone()).collect();
    assert_eq!(got, expected);
    assert_eq!(table.rows[0].label, "12/25");
    assert_eq!(table.rows[0].price, 1);
    assert_eq!(table.rows[9].label, "03/25");
    assert_eq!(table.rows[9].price, 10);
    Ok(())
}

#[test]
fn deleted_product_loads_as_not_found() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let catalog = ProductCatalog::new(store.clone(), StoreLayout::default());
    let grids = PriceGridStore::new(store.clone(), StoreLayout::default(), GridStoreConfig::default());
    let barcode = Barcode::new("012345")?;

    grids.load(&barcode)?;
    catalog.delete(&barcode)?;

    assert!(!store.get(&path("products/012345/prices/A"))?.exists());
    assert!(!store.get(&path("products/012345/prices/B"))?.exists());
    assert_eq!(grids.load(&barcode), Err(PriceGridError::NotFound(barcode.clone())));
    assert!(matches!(catalog.get(&barcode), Err(CatalogError::NotFound(_))));
    Ok(())
}

#[test]
fn grid_store_remove_deletes_whole_product() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let grids = PriceGridStore::new(store.clone(), StoreLayout::default(), GridStoreConfig::default());
    let barcode = Barcode::new("012345")?;

    grids.load(&barcode)?;
    grids.remove(&barcode)?;
    assert_eq!(grids.view(&barcode)?, None);
    assert!(!store.get(&path("products/012345"))?.exists());
    Ok(())
}

#[test]
fn new_product_gets_first_partner() -> anyhow::Result<()> {
    init_logs();
    let store: Store = Arc::new(InMemoryDocumentStore::new());
    let catalog = ProductCatalog::new(store.clone(), StoreLayout::default());
    let coordinator = coordinator(&store);

    let product = catalog.create(CreateProduct {
        barcode: "777".to_string(),
        category: "Devices".to_string(),
        description: "Meter".to_string(),
    })?;

    let view = coordinator.introduce_partner(product.barcode(), "Walk-in")?;
    assert_eq!(view.partners, vec![key("Walk-in")]);
    assert_eq!(view.grid, PriceGrid::zeroed());

    assert_eq!(catalog.get(product.barcode())?.partner_keys(), &[key("Walk-in")]);
    assert_eq!(catalog.list()?[0].partner_count, 1);
    Ok(())
}

#[test]
fn catalog_barcodes_feed_grid_store() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    store.set(&path("products/999"), json!({"category": "Devices", "description": "Lancets"}))?;
    let catalog = ProductCatalog::new(store.clone(), StoreLayout::default());
    let grids = PriceGridStore::new(store.clone(), StoreLayout::default(), GridStoreConfig::default());

    let views = grids.load_all(catalog.barcodes()?)?;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].active, Some(key("A")));
    assert_eq!(views[1].active, None);
    Ok(())
}

#[test]
fn live_updates_and_edits_interleave() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let coordinator = coordinator(&store);
    let grids: &PriceGridStore<Store> = coordinator.grids();
    let barcode = Barcode::new("012345")?;

    let feed = grids.watch(&barcode)?;
    feed.drain(grids)?;

    // Another client edits A.price2; a stale one-shot read races the push.
    let stale = store.get(&path("products/012345"))?;
    store.set(&path("products/012345/prices/A/price2"), json!(20))?;
    feed.drain(grids)?;
    assert!(!grids.apply_snapshot(&barcode, &stale)?);

    let view = grids.view(&barcode)?.context("cached")?;
    assert_eq!(view.grid.cells()[1], 20);

    // Our own edit round-trips through the feed without regressing.
    coordinator.override_price(&barcode, 2, "21")?;
    feed.drain(grids)?;
    assert_eq!(grids.view(&barcode)?.context("cached")?.grid.cells()[1], 21);
    Ok(())
}

#[test]
fn remote_failure_is_reported_and_not_rolled_back() -> anyhow::Result<()> {
    init_logs();
    let store = scenario_store();
    let coordinator = coordinator(&store);
    let notices = coordinator.subscribe_notices();
    let barcode = Barcode::new("012345")?;
    coordinator.grids().load(&barcode)?;

    store.set_available(false);
    let err = coordinator.override_price(&barcode, 1, "500").unwrap_err();
    assert!(matches!(err, PriceEditError::Grid(PriceGridError::Remote(_))));

    let view = coordinator.grids().view(&barcode)?.context("cached")?;
    assert!(view.diverged);
    assert_eq!(view.grid.cells()[0], 500);
    assert_eq!(notices.pending().len(), 1);

    store.set_available(true);
    let reloaded = coordinator.grids().load(&barcode)?;
    assert!(!reloaded.diverged);
    assert_eq!(reloaded.grid.cells()[0], 1);
    Ok(())
}

proptest! {
    #[test]
    fn override_changes_exactly_one_slot(
        cells in prop::array::uniform10(0u32..10_000),
        slot in 1usize..=PRICE_SLOTS,
        value in 0u32..1_000_000,
    ) {
        let store: Store = Arc::new(InMemoryDocumentStore::new());
        store
            .set(
                &path("products/1"),
                json!({"category": "c", "description": "d", "prices": {"P": PriceGrid::from_cells(cells).to_document()}}),
            )
            .unwrap();
        let grids = PriceGridStore::new(store.clone(), StoreLayout::default(), GridStoreConfig::default());
        let barcode = Barcode::new("1").unwrap();

        let view = grids.override_cell(&barcode, slot, &value.to_string()).unwrap();
        let reread = PriceGrid::from_document(store.get(&path("products/1/prices/P")).unwrap().value.as_ref());

        for (i, (&before, &after)) in cells.iter().zip(reread.cells()).enumerate() {
            if i + 1 == slot {
                prop_assert_eq!(after, value);
            } else {
                prop_assert_eq!(after, before);
            }
        }
        prop_assert_eq!(view.grid, reread);
    }
}
