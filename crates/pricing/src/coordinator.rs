//! The three editing flows (select partner, introduce partner, override a
//! price) plus the labelled price table shown next to them.
//!
//! Every flow publishes a [`Notice`] with its outcome. Failures are returned
//! as well; nothing is rolled back on a remote failure.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use stripmarket_catalog::CategoryDirectory;
use stripmarket_core::{Barcode, DomainError, PartnerKey};
use stripmarket_partners::{Partner, PartnerKind, PartnerRegistry};
use stripmarket_store::{DocumentStore, StoreLayout};

use crate::error::{PriceEditError, PriceGridError};
use crate::grid::{PRICE_SLOTS, PriceSlot};
use crate::grid_store::{GridStoreConfig, GridView, PriceGridStore};
use crate::labels::labels;
use crate::notice::{Notice, NoticeBoard, NoticeFeed};

/// Whether a grid may be created for a partner the registry does not know.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PartnerPolicy {
    /// Unknown selections become free-text grid keys.
    #[default]
    AllowFreeText,
    /// Only registry entries may get a grid.
    RequireRegistered,
}

impl FromStr for PartnerPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow-free-text" => Ok(PartnerPolicy::AllowFreeText),
            "require-registered" => Ok(PartnerPolicy::RequireRegistered),
            other => Err(DomainError::validation(format!("unknown partner policy '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorConfig {
    pub partner_policy: PartnerPolicy,
    /// Which registry partners are picked from.
    pub partner_kind: PartnerKind,
}

impl CoordinatorConfig {
    /// Defaults, overridden by `STRIPMARKET_PARTNER_POLICY`
    /// (`allow-free-text` | `require-registered`) and `STRIPMARKET_PARTNER_KIND`
    /// (`buyer` | `wholesaler`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let partner_policy = std::env::var("STRIPMARKET_PARTNER_POLICY")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(policy) => Some(policy),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring STRIPMARKET_PARTNER_POLICY");
                    None
                }
            })
            .unwrap_or(defaults.partner_policy);
        let partner_kind = match std::env::var("STRIPMARKET_PARTNER_KIND").as_deref().map(str::trim) {
            Ok("buyer") => PartnerKind::Buyer,
            Ok("wholesaler") => PartnerKind::Wholesaler,
            Ok(other) => {
                tracing::warn!(value = other, "ignoring STRIPMARKET_PARTNER_KIND");
                defaults.partner_kind
            }
            Err(_) => defaults.partner_kind,
        };

        let config = Self {
            partner_policy,
            partner_kind,
        };
        tracing::debug!(?config, "resolved coordinator config");
        config
    }
}

/// One labelled cell of the active partner's grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub slot: PriceSlot,
    pub label: String,
    pub price: u32,
}

/// The active partner's grid with month labels, cell 1 first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceTable {
    pub barcode: Barcode,
    pub partner: Option<PartnerKey>,
    pub partner_name: Option<String>,
    pub rows: Vec<PriceRow>,
}

/// Edit flows over one store: grids, the partner registry of the configured
/// kind, and the category anchors used for labels.
#[derive(Debug)]
pub struct PriceEditCoordinator<S> {
    grids: Arc<PriceGridStore<S>>,
    registry: Arc<PartnerRegistry<S>>,
    categories: Arc<CategoryDirectory<S>>,
    config: CoordinatorConfig,
    notices: NoticeBoard,
}

impl<S> PriceEditCoordinator<S>
where
    S: DocumentStore + Clone,
{
    pub fn new(store: S, layout: StoreLayout, grid_config: GridStoreConfig, config: CoordinatorConfig) -> Self {
        Self {
            grids: Arc::new(PriceGridStore::new(store.clone(), layout.clone(), grid_config)),
            registry: Arc::new(PartnerRegistry::new(store.clone(), layout.clone(), config.partner_kind)),
            categories: Arc::new(CategoryDirectory::new(store, layout)),
            config,
            notices: NoticeBoard::default(),
        }
    }
}

impl<S> PriceEditCoordinator<S>
where
    S: DocumentStore,
{
    /// Assemble from shared components.
    pub fn from_parts(
        grids: Arc<PriceGridStore<S>>,
        registry: Arc<PartnerRegistry<S>>,
        categories: Arc<CategoryDirectory<S>>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            grids,
            registry,
            categories,
            config,
            notices: NoticeBoard::default(),
        }
    }

    pub fn grids(&self) -> &Arc<PriceGridStore<S>> {
        &self.grids
    }

    pub fn registry(&self) -> &Arc<PartnerRegistry<S>> {
        &self.registry
    }

    pub fn categories(&self) -> &Arc<CategoryDirectory<S>> {
        &self.categories
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn subscribe_notices(&self) -> NoticeFeed {
        self.notices.subscribe()
    }

    /// Show the grid of a partner that already has one on this product.
    ///
    /// `selection` is a grid key, or a registry name resolving to one.
    pub fn select_partner(&self, barcode: &Barcode, selection: &str) -> Result<GridView, PriceEditError> {
        let result = self.resolve_existing(barcode, selection).and_then(|key| {
            self.grids
                .switch_partner(barcode, &key)
                .map_err(PriceEditError::from)
        });
        self.report(result, |view| {
            format!("Showing prices for {}", self.partner_label(view.active.as_ref()))
        })
    }

    /// Give a partner its first (all-zero) grid on this product.
    ///
    /// A partner that already has a grid is rejected whichever key the grid
    /// sits under (registry id, display name, or untrimmed free text).
    pub fn introduce_partner(&self, barcode: &Barcode, selection: &str) -> Result<GridView, PriceEditError> {
        let result = self.new_grid_key(barcode, selection).and_then(|key| {
            self.grids
                .add_partner(barcode, &key)
                .map_err(PriceEditError::from)
        });
        self.report(result, |view| {
            format!("Added {} to {}", self.partner_label(view.active.as_ref()), view.barcode)
        })
    }

    /// Override one cell of the active partner's grid.
    ///
    /// Every non-digit character of `input` is dropped first ("$2,50" is 250).
    pub fn override_price(&self, barcode: &Barcode, slot: usize, input: &str) -> Result<GridView, PriceEditError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        let result = if digits.is_empty() {
            Err(PriceGridError::InvalidValue(input.to_string()).into())
        } else {
            self.grids
                .override_cell(barcode, slot, &digits)
                .map_err(PriceEditError::from)
        };
        self.report(result, |view| {
            format!("Price {slot} set to {} for {}", view.grid.cells()[slot - 1], view.barcode)
        })
    }

    /// The active partner's cells paired positionally with the category's labels.
    pub fn price_table(&self, barcode: &Barcode) -> Result<PriceTable, PriceEditError> {
        let view = match self.grids.view(barcode)? {
            Some(view) => view,
            None => self.grids.load(barcode)?,
        };
        let anchor = match &view.category {
            Some(category) => self.categories.anchor(category)?,
            None => None,
        };

        let rows = PriceSlot::all()
            .zip(labels(anchor.as_deref(), PRICE_SLOTS))
            .map(|(slot, label)| PriceRow {
                slot,
                label,
                price: view.grid.get(slot),
            })
            .collect();

        let partner_name = match &view.active {
            Some(key) => Some(self.registry.display_name(key)?),
            None => None,
        };

        Ok(PriceTable {
            barcode: view.barcode,
            partner: view.active,
            partner_name,
            rows,
        })
    }

    /// A grid key already present on the product.
    fn resolve_existing(&self, barcode: &Barcode, selection: &str) -> Result<PartnerKey, PriceEditError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(PriceEditError::BlankPartner);
        }
        let partners = self.product_partners(barcode)?;

        if let Some(key) = find_key(&partners, selection) {
            return Ok(key.clone());
        }
        match self.canonical_key(selection) {
            Ok(key) => match self.grid_for(&partners, &key)? {
                Some(existing) => Ok(existing),
                None => Err(PriceGridError::InvalidPartner(key).into()),
            },
            Err(PriceEditError::Registry(err)) => Err(err.into()),
            Err(_) => Err(PriceGridError::InvalidPartner(PartnerKey::new(selection)?).into()),
        }
    }

    /// Key for a partner that has no grid on the product yet.
    fn new_grid_key(&self, barcode: &Barcode, selection: &str) -> Result<PartnerKey, PriceEditError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(PriceEditError::BlankPartner);
        }
        let partners = self.product_partners(barcode)?;

        if let Some(existing) = find_key(&partners, selection) {
            return Err(PriceGridError::DuplicatePartner(existing.clone()).into());
        }
        let key = self.canonical_key(selection)?;
        match self.grid_for(&partners, &key)? {
            Some(existing) => Err(PriceGridError::DuplicatePartner(existing).into()),
            None => Ok(key),
        }
    }

    /// The product's grid for `key`, also matching grids that older clients
    /// keyed by the partner's display name.
    fn grid_for(&self, partners: &[PartnerKey], key: &PartnerKey) -> Result<Option<PartnerKey>, PriceEditError> {
        if partners.contains(key) {
            return Ok(Some(key.clone()));
        }
        let name = self.registry.display_name(key)?;
        Ok(find_key(partners, &name).cloned())
    }

    fn product_partners(&self, barcode: &Barcode) -> Result<Vec<PartnerKey>, PriceEditError> {
        Ok(match self.grids.view(barcode)? {
            Some(view) => view.partners,
            None => self.grids.load(barcode)?.partners,
        })
    }

    /// Grid key for a partner selection.
    ///
    /// A registry id, or a name matching exactly one registry entry, maps to
    /// the registry id. Anything else is kept as free text when the policy
    /// allows it.
    fn canonical_key(&self, selection: &str) -> Result<PartnerKey, PriceEditError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(PriceEditError::BlankPartner);
        }

        let partners = self.registry.list()?;
        if let Some(partner) = partners.iter().find(|p| p.id_typed().as_str() == selection) {
            return Ok(PartnerKey::from(partner.id_typed()));
        }

        let named: Vec<&Partner> = partners.iter().filter(|p| p.name() == selection).collect();
        match named.as_slice() {
            [partner] => Ok(PartnerKey::from(partner.id_typed())),
            [] => match self.config.partner_policy {
                PartnerPolicy::AllowFreeText => {
                    tracing::debug!(selection, "unregistered partner kept as free-text key");
                    Ok(PartnerKey::new(selection)?)
                }
                PartnerPolicy::RequireRegistered => Err(PriceEditError::UnregisteredPartner(selection.to_string())),
            },
            many => Err(PriceEditError::AmbiguousPartner {
                name: selection.to_string(),
                matches: many.len(),
            }),
        }
    }

    fn partner_label(&self, key: Option<&PartnerKey>) -> String {
        match key {
            Some(key) => self
                .registry
                .cached()
                .ok()
                .flatten()
                .and_then(|partners| {
                    partners
                        .into_iter()
                        .find(|p| p.id_typed().as_str() == key.as_str())
                        .map(|p| p.name().to_string())
                })
                .unwrap_or_else(|| key.to_string()),
            None => "no partner".to_string(),
        }
    }

    fn report<T>(&self, result: Result<T, PriceEditError>, success: impl FnOnce(&T) -> String) -> Result<T, PriceEditError> {
        match &result {
            Ok(value) => self.notices.publish(Notice::info(success(value))),
            Err(err) => self.notices.publish(Notice::error(err.to_string())),
        }
        result
    }
}

/// Existing grid key matching a trimmed selection; exact matches win over
/// keys stored with stray whitespace.
fn find_key<'a>(partners: &'a [PartnerKey], selection: &str) -> Option<&'a PartnerKey> {
    partners
        .iter()
        .find(|k| k.as_str() == selection)
        .or_else(|| partners.iter().find(|k| k.as_str().trim() == selection))
}
