//! Cached price grids per product.
//!
//! State per barcode: the product document (identity plus the ordered list of
//! partner keys), one revision-tagged grid per partner that has been read, and
//! the locally selected active partner. One-shot reads and live snapshots are
//! merged with the same rule: data replaces a cache entry only if it was read
//! at a strictly newer store revision.
//!
//! Edits are optimistic. Validation happens first and changes nothing on
//! failure; then the local state is updated and the remote write is issued. A
//! failed write is not rolled back: the product is flagged `diverged` until the
//! next full reload (immediately, under [`ReconcilePolicy::ReloadOnFailure`]).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use stripmarket_catalog::Product;
use stripmarket_catalog::product::PRICES_KEY;
use stripmarket_core::{Barcode, CategoryName, DomainError, PartnerKey};
use stripmarket_store::{
    DocumentPath, DocumentStore, Revision, Snapshot, StoreError, StoreLayout, Subscription, Versioned,
};

use crate::error::PriceGridError;
use crate::grid::{PriceGrid, PriceSlot, parse_price};

/// What to do after a remote write failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// Keep the optimistic local state and flag the divergence.
    #[default]
    KeepLocal,
    /// Flag the divergence, then immediately try a full reload.
    ReloadOnFailure,
}

impl FromStr for ReconcilePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-local" => Ok(ReconcilePolicy::KeepLocal),
            "reload-on-failure" => Ok(ReconcilePolicy::ReloadOnFailure),
            other => Err(DomainError::validation(format!("unknown reconcile policy '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct GridStoreConfig {
    pub reconcile: ReconcilePolicy,
}

impl GridStoreConfig {
    /// Defaults, with `STRIPMARKET_RECONCILE` (`keep-local` | `reload-on-failure`)
    /// applied when set and valid.
    pub fn from_env() -> Self {
        let reconcile = match std::env::var("STRIPMARKET_RECONCILE") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring STRIPMARKET_RECONCILE");
                ReconcilePolicy::default()
            }),
            Err(_) => ReconcilePolicy::default(),
        };
        tracing::debug!(?reconcile, "resolved grid store config");
        Self { reconcile }
    }
}

/// Cached state of one product, as shown to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub barcode: Barcode,
    pub category: Option<CategoryName>,
    pub description: String,
    pub image_url: Option<String>,
    /// Partners with a grid on this product, in store order.
    pub partners: Vec<PartnerKey>,
    pub active: Option<PartnerKey>,
    /// Cells of the active partner (all zero without one).
    pub grid: PriceGrid,
    pub revision: Revision,
    /// A write failed after the local state was updated.
    pub diverged: bool,
}

#[derive(Debug)]
struct ProductGridState {
    product: Versioned<Product>,
    grids: HashMap<PartnerKey, Versioned<PriceGrid>>,
    active: Option<PartnerKey>,
    diverged: bool,
}

impl ProductGridState {
    fn from_snapshot(barcode: &Barcode, snapshot: &Snapshot, active: Option<PartnerKey>) -> Self {
        let mut state = Self {
            product: Versioned::new(
                snapshot.revision,
                Product::from_document(barcode.clone(), snapshot.value.as_ref()),
            ),
            grids: HashMap::new(),
            active,
            diverged: false,
        };
        state.merge_grids(snapshot);
        state
    }

    /// Merge a product-level snapshot. Returns whether it was newer.
    fn merge(&mut self, barcode: &Barcode, snapshot: &Snapshot) -> bool {
        let product = Product::from_document(barcode.clone(), snapshot.value.as_ref());
        if !self.product.offer(snapshot.revision, product) {
            return false;
        }
        self.merge_grids(snapshot);
        self.diverged = false;
        true
    }

    fn merge_grids(&mut self, snapshot: &Snapshot) {
        let partners = self.product.value().partner_keys().to_vec();
        self.grids.retain(|key, _| partners.contains(key));

        let prices = snapshot.child(PRICES_KEY);
        for key in &partners {
            let grid = PriceGrid::from_document(prices.and_then(|p| p.get(key.as_str())));
            self.offer_grid(key, snapshot.revision, grid);
        }

        let active_known = self.active.as_ref().is_some_and(|a| partners.contains(a));
        if !active_known {
            self.active = partners.first().cloned();
        }
    }

    fn offer_grid(&mut self, key: &PartnerKey, revision: Revision, grid: PriceGrid) -> bool {
        match self.grids.get_mut(key) {
            Some(cell) => cell.offer(revision, grid),
            None => {
                self.grids.insert(key.clone(), Versioned::new(revision, grid));
                true
            }
        }
    }

    fn knows(&self, key: &PartnerKey) -> bool {
        self.product.value().partner_keys().contains(key)
    }

    fn view(&self) -> GridView {
        let product = self.product.value();
        let grid = self
            .active
            .as_ref()
            .and_then(|key| self.grids.get(key))
            .map(|cell| *cell.value())
            .unwrap_or_default();

        GridView {
            barcode: product.barcode().clone(),
            category: product.category().cloned(),
            description: product.description().to_string(),
            image_url: product.image_url().map(str::to_string),
            partners: product.partner_keys().to_vec(),
            active: self.active.clone(),
            grid,
            revision: self.product.revision(),
            diverged: self.diverged,
        }
    }
}

type Products = HashMap<Barcode, ProductGridState>;

/// Per-product, per-partner price grids over a [`DocumentStore`].
#[derive(Debug)]
pub struct PriceGridStore<S> {
    store: S,
    layout: StoreLayout,
    config: GridStoreConfig,
    products: RwLock<Products>,
}

impl<S> PriceGridStore<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, layout: StoreLayout, config: GridStoreConfig) -> Self {
        Self {
            store,
            layout,
            config,
            products: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GridStoreConfig {
        &self.config
    }

    /// Read a product and merge it into the cache.
    ///
    /// The first partner (store order) becomes active unless a still-present
    /// partner was already selected. A product flagged `diverged` is replaced
    /// outright by the remote document.
    pub fn load(&self, barcode: &Barcode) -> Result<GridView, PriceGridError> {
        let snapshot = self.store.get(&self.layout.product_path(barcode)?)?;

        let mut products = self.write_products()?;
        merge_snapshot(&mut products, barcode, &snapshot, true);
        products
            .get(barcode)
            .map(ProductGridState::view)
            .ok_or_else(|| PriceGridError::NotFound(barcode.clone()))
    }

    /// Load several products, skipping barcodes that no longer exist.
    pub fn load_all<I>(&self, barcodes: I) -> Result<Vec<GridView>, PriceGridError>
    where
        I: IntoIterator<Item = Barcode>,
    {
        let mut views = Vec::new();
        for barcode in barcodes {
            match self.load(&barcode) {
                Ok(view) => views.push(view),
                Err(PriceGridError::NotFound(_)) => {
                    tracing::debug!(barcode = %barcode, "product vanished before load");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(views)
    }

    /// Make `key` the active partner, re-reading its cells from the store.
    pub fn switch_partner(&self, barcode: &Barcode, key: &PartnerKey) -> Result<GridView, PriceGridError> {
        self.ensure_loaded(barcode)?;
        {
            let products = self.read_products()?;
            let state = lookup(&products, barcode)?;
            if !state.knows(key) {
                return Err(PriceGridError::InvalidPartner(key.clone()));
            }
        }

        let snapshot = self.store.get(&self.grid_path(barcode, key)?)?;

        let mut products = self.write_products()?;
        let state = lookup_mut(&mut products, barcode)?;
        if !state.knows(key) {
            return Err(PriceGridError::InvalidPartner(key.clone()));
        }
        let grid = PriceGrid::from_document(snapshot.value.as_ref());
        if !state.offer_grid(key, snapshot.revision, grid) {
            tracing::debug!(barcode = %barcode, partner = %key, revision = snapshot.revision.get(), "stale grid read discarded");
        }
        state.active = Some(key.clone());
        tracing::info!(barcode = %barcode, partner = %key, "active partner switched");
        Ok(state.view())
    }

    /// Create an all-zero grid for a new partner and make it active.
    pub fn add_partner(&self, barcode: &Barcode, key: &PartnerKey) -> Result<GridView, PriceGridError> {
        self.ensure_loaded(barcode)?;
        let path = self.grid_path(barcode, key)?;
        {
            let mut products = self.write_products()?;
            let state = lookup_mut(&mut products, barcode)?;
            if state.knows(key) {
                return Err(PriceGridError::DuplicatePartner(key.clone()));
            }
            let revision = state.product.revision();
            state.product.edit(|p| p.record_partner(key.clone()));
            state.grids.insert(key.clone(), Versioned::new(revision, PriceGrid::zeroed()));
            state.active = Some(key.clone());
        }

        let write = self.store.set(&path, PriceGrid::zeroed().to_document());
        let revision = self.settle(barcode, write, |state, revision| {
            state.product.acknowledge(revision);
            if let Some(cell) = state.grids.get_mut(key) {
                cell.acknowledge(revision);
            }
        })?;
        tracing::info!(barcode = %barcode, partner = %key, revision = revision.get(), "partner grid created");
        self.cached_view(barcode)
    }

    /// Write one cell of the active partner's grid. The other nine cells are
    /// neither read nor written.
    pub fn override_cell(&self, barcode: &Barcode, slot: usize, value: &str) -> Result<GridView, PriceGridError> {
        let slot = PriceSlot::new(slot).ok_or(PriceGridError::InvalidSlot(slot))?;
        let price = parse_price(value).ok_or_else(|| PriceGridError::InvalidValue(value.to_string()))?;
        self.ensure_loaded(barcode)?;

        let (key, path) = {
            let mut products = self.write_products()?;
            let state = lookup_mut(&mut products, barcode)?;
            let key = state
                .active
                .clone()
                .ok_or_else(|| PriceGridError::NoActivePartner(barcode.clone()))?;
            let path = self.grid_path(barcode, &key)?.child(slot.field())?;

            let revision = state.product.revision();
            state
                .grids
                .entry(key.clone())
                .or_insert_with(|| Versioned::new(revision, PriceGrid::zeroed()))
                .edit(|grid| grid.set(slot, price));
            (key, path)
        };

        let write = self.store.set(&path, Value::from(price));
        let revision = self.settle(barcode, write, |state, revision| {
            if let Some(cell) = state.grids.get_mut(&key) {
                cell.acknowledge(revision);
            }
        })?;
        tracing::info!(
            barcode = %barcode,
            partner = %key,
            slot = slot.number(),
            price,
            revision = revision.get(),
            "price cell overridden"
        );
        self.cached_view(barcode)
    }

    /// Delete the product document with every partner grid under it.
    pub fn remove(&self, barcode: &Barcode) -> Result<(), PriceGridError> {
        let revision = self.store.remove(&self.layout.product_path(barcode)?)?;
        self.write_products()?.remove(barcode);
        tracing::info!(barcode = %barcode, revision = revision.get(), "product and grids removed");
        Ok(())
    }

    /// Cached state, without touching the store.
    pub fn view(&self, barcode: &Barcode) -> Result<Option<GridView>, PriceGridError> {
        Ok(self.read_products()?.get(barcode).map(ProductGridState::view))
    }

    /// Watch a product for remote changes; apply them with [`GridFeed::drain`].
    pub fn watch(&self, barcode: &Barcode) -> Result<GridFeed, PriceGridError> {
        let path = self.layout.product_path(barcode)?;
        Ok(GridFeed {
            barcode: barcode.clone(),
            subscription: self.store.subscribe(&path),
        })
    }

    /// Merge a live snapshot of a product document. Returns whether it was newer.
    pub fn apply_snapshot(&self, barcode: &Barcode, snapshot: &Snapshot) -> Result<bool, PriceGridError> {
        let mut products = self.write_products()?;
        Ok(merge_snapshot(&mut products, barcode, snapshot, false))
    }

    fn ensure_loaded(&self, barcode: &Barcode) -> Result<(), PriceGridError> {
        if self.read_products()?.contains_key(barcode) {
            return Ok(());
        }
        self.load(barcode).map(|_| ())
    }

    fn cached_view(&self, barcode: &Barcode) -> Result<GridView, PriceGridError> {
        self.view(barcode)?
            .ok_or_else(|| PriceGridError::NotFound(barcode.clone()))
    }

    /// Finish an optimistic write: acknowledge it, or flag the divergence.
    fn settle(
        &self,
        barcode: &Barcode,
        write: Result<Revision, StoreError>,
        acknowledge: impl FnOnce(&mut ProductGridState, Revision),
    ) -> Result<Revision, PriceGridError> {
        match write {
            Ok(revision) => {
                if let Some(state) = self.write_products()?.get_mut(barcode) {
                    acknowledge(state, revision);
                }
                Ok(revision)
            }
            Err(err) => {
                self.diverge(barcode, &err)?;
                Err(err.into())
            }
        }
    }

    fn diverge(&self, barcode: &Barcode, cause: &StoreError) -> Result<(), PriceGridError> {
        if let Some(state) = self.write_products()?.get_mut(barcode) {
            state.diverged = true;
        }
        tracing::warn!(
            barcode = %barcode,
            error = %cause,
            "remote write failed; local grid kept and differs from the store"
        );

        if self.config.reconcile == ReconcilePolicy::ReloadOnFailure {
            match self.load(barcode) {
                Ok(view) => tracing::info!(barcode = %barcode, revision = view.revision.get(), "reloaded after failed write"),
                Err(err) => tracing::warn!(barcode = %barcode, error = %err, "reload after failed write failed"),
            }
        }
        Ok(())
    }

    fn grid_path(&self, barcode: &Barcode, key: &PartnerKey) -> Result<DocumentPath, StoreError> {
        self.layout.product_path(barcode)?.child(PRICES_KEY)?.child(key)
    }

    fn read_products(&self) -> Result<RwLockReadGuard<'_, Products>, StoreError> {
        self.products.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_products(&self) -> Result<RwLockWriteGuard<'_, Products>, StoreError> {
        self.products.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Merge a product snapshot into the cache. A newer snapshot without a value
/// evicts the product. `full_reload` lets a snapshot at the held revision
/// replace a diverged product.
fn merge_snapshot(products: &mut Products, barcode: &Barcode, snapshot: &Snapshot, full_reload: bool) -> bool {
    if let Some(state) = products.get(barcode) {
        let held = state.product.revision();
        let replace = full_reload && state.diverged && snapshot.revision >= held;
        if !replace && !state.product.accepts(snapshot.revision) {
            tracing::debug!(
                barcode = %barcode,
                held = held.get(),
                offered = snapshot.revision.get(),
                "stale product snapshot discarded"
            );
            return false;
        }
        if replace {
            if snapshot.exists() {
                let active = state.active.clone();
                products.insert(barcode.clone(), ProductGridState::from_snapshot(barcode, snapshot, active));
            } else {
                products.remove(barcode);
            }
            return true;
        }
    }

    if !snapshot.exists() {
        if products.remove(barcode).is_some() {
            tracing::debug!(barcode = %barcode, revision = snapshot.revision.get(), "product evicted");
        }
        return true;
    }

    match products.get_mut(barcode) {
        Some(state) => state.merge(barcode, snapshot),
        None => {
            products.insert(barcode.clone(), ProductGridState::from_snapshot(barcode, snapshot, None));
            true
        }
    }
}

fn lookup<'a>(products: &'a Products, barcode: &Barcode) -> Result<&'a ProductGridState, PriceGridError> {
    products
        .get(barcode)
        .ok_or_else(|| PriceGridError::NotFound(barcode.clone()))
}

fn lookup_mut<'a>(products: &'a mut Products, barcode: &Barcode) -> Result<&'a mut ProductGridState, PriceGridError> {
    products
        .get_mut(barcode)
        .ok_or_else(|| PriceGridError::NotFound(barcode.clone()))
}

/// Live updates of one product. Dropping the feed unsubscribes.
#[derive(Debug)]
pub struct GridFeed {
    barcode: Barcode,
    subscription: Subscription,
}

impl GridFeed {
    pub fn barcode(&self) -> &Barcode {
        &self.barcode
    }

    /// Apply every snapshot delivered so far. Returns how many were newer
    /// than the cache.
    pub fn drain<S: DocumentStore>(&self, grids: &PriceGridStore<S>) -> Result<usize, PriceGridError> {
        let mut applied = 0;
        for snapshot in self.subscription.pending() {
            if grids.apply_snapshot(&self.barcode, &snapshot)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}
