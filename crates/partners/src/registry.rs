//! Global partner registry with a revision-versioned local cache.
//!
//! `list()`/`refresh()` answer with a one-shot read; a [`RegistryFeed`] applies
//! live snapshots. Both go through the same merge rule, so a slow read can never
//! replace a list already updated by a newer push.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use stripmarket_core::{PartnerId, PartnerKey};
use stripmarket_store::{DocumentStore, Snapshot, StoreError, StoreLayout, Subscription, Versioned};

use crate::error::RegistryError;
use crate::partner::{NewPartner, Partner, PartnerKind, PartnerUpdate};

/// Registry of one partner kind (buyers or wholesalers).
#[derive(Debug)]
pub struct PartnerRegistry<S> {
    store: S,
    layout: StoreLayout,
    kind: PartnerKind,
    cache: RwLock<Option<Versioned<Vec<Partner>>>>,
}

impl<S> PartnerRegistry<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, layout: StoreLayout, kind: PartnerKind) -> Self {
        Self {
            store,
            layout,
            kind,
            cache: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> PartnerKind {
        self.kind
    }

    /// Every entry in store order (fresh read).
    pub fn list(&self) -> Result<Vec<Partner>, RegistryError> {
        self.refresh()
    }

    /// Re-read the registry root and merge it into the cache.
    ///
    /// Returns the cached list after the merge, which is newer than the read
    /// when a push overtook it.
    pub fn refresh(&self) -> Result<Vec<Partner>, RegistryError> {
        let snapshot = self.store.get(&self.root()?)?;
        self.apply_snapshot(&snapshot)?;
        Ok(self.cached()?.unwrap_or_default())
    }

    /// The cached list without touching the store (`None` before the first read).
    pub fn cached(&self) -> Result<Option<Vec<Partner>>, RegistryError> {
        Ok(self.read_cache()?.as_ref().map(|c| c.value().clone()))
    }

    /// Register a partner by display name only. Duplicate names are allowed.
    pub fn add(&self, name: &str) -> Result<PartnerId, RegistryError> {
        self.add_partner(NewPartner::named(name))
    }

    pub fn add_partner(&self, partner: NewPartner) -> Result<PartnerId, RegistryError> {
        let doc = partner.to_document()?;
        let (key, revision) = self.store.push(&self.root()?, doc)?;
        let id = PartnerId::new(key)?;
        tracing::info!(kind = %self.kind, partner = %id, revision = revision.get(), "partner registered");
        Ok(id)
    }

    pub fn get(&self, id: &PartnerId) -> Result<Partner, RegistryError> {
        let snapshot = self.store.get(&self.root()?.child(id)?)?;
        if !snapshot.exists() {
            return Err(RegistryError::NotFound(id.clone()));
        }
        Ok(Partner::from_document(id.clone(), self.kind, snapshot.value.as_ref()))
    }

    /// Write the supplied fields of `update`. Returns `false` (and writes
    /// nothing) when no field was supplied.
    pub fn update(&self, id: &PartnerId, update: &PartnerUpdate) -> Result<bool, RegistryError> {
        if update.is_empty() {
            tracing::debug!(partner = %id, "empty partner update ignored");
            return Ok(false);
        }
        let fields = update.fields()?;

        let path = self.root()?.child(id)?;
        if !self.store.get(&path)?.exists() {
            return Err(RegistryError::NotFound(id.clone()));
        }
        let revision = self.store.update(&path, fields)?;
        tracing::info!(kind = %self.kind, partner = %id, revision = revision.get(), "partner updated");
        Ok(true)
    }

    /// Watch the registry root.
    pub fn subscribe(&self) -> Result<RegistryFeed, RegistryError> {
        Ok(RegistryFeed {
            subscription: self.store.subscribe(&self.root()?),
        })
    }

    /// Merge a snapshot of the registry root into the cache. Returns whether
    /// the cache changed.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<bool, RegistryError> {
        let partners = self.parse(snapshot.value.as_ref());
        let mut cache = self.write_cache()?;

        match cache.as_mut() {
            None => {
                *cache = Some(Versioned::new(snapshot.revision, partners));
                Ok(true)
            }
            Some(cell) => {
                let applied = cell.offer(snapshot.revision, partners);
                if !applied {
                    tracing::debug!(
                        kind = %self.kind,
                        held = cell.revision().get(),
                        offered = snapshot.revision.get(),
                        "stale registry snapshot discarded"
                    );
                }
                Ok(applied)
            }
        }
    }

    /// Display name for a grid key: the registry name when the key is a known
    /// id, otherwise the key itself (free-text keys).
    pub fn display_name(&self, key: &PartnerKey) -> Result<String, RegistryError> {
        let partners = match self.cached()? {
            Some(partners) => partners,
            None => self.refresh()?,
        };
        Ok(partners
            .iter()
            .find(|p| p.id_typed().as_str() == key.as_str())
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| key.to_string()))
    }

    /// Entries whose display name equals `name` (trimmed, case-sensitive).
    pub fn find_by_name(&self, name: &str) -> Result<Vec<Partner>, RegistryError> {
        let name = name.trim();
        Ok(self.list()?.into_iter().filter(|p| p.name() == name).collect())
    }

    fn root(&self) -> Result<stripmarket_store::DocumentPath, StoreError> {
        self.kind.root(&self.layout)
    }

    fn parse(&self, root: Option<&Value>) -> Vec<Partner> {
        let Some(Value::Object(entries)) = root else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|(key, doc)| {
                let id = PartnerId::new(key).ok()?;
                Some(Partner::from_document(id, self.kind, Some(doc)))
            })
            .collect()
    }

    fn read_cache(&self) -> Result<RwLockReadGuard<'_, Option<Versioned<Vec<Partner>>>>, StoreError> {
        self.cache.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_cache(&self) -> Result<RwLockWriteGuard<'_, Option<Versioned<Vec<Partner>>>>, StoreError> {
        self.cache.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Live registry updates. Dropping the feed unsubscribes.
#[derive(Debug)]
pub struct RegistryFeed {
    subscription: Subscription,
}

impl RegistryFeed {
    /// Apply every snapshot delivered so far. Returns whether the cache changed.
    pub fn drain<S: DocumentStore>(&self, registry: &PartnerRegistry<S>) -> Result<bool, RegistryError> {
        let mut changed = false;
        for snapshot in self.subscription.pending() {
            changed |= registry.apply_snapshot(&snapshot)?;
        }
        Ok(changed)
    }
}
