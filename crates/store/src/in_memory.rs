//! In-memory document store for tests/dev.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, mpsc};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::StoreError;
use crate::path::DocumentPath;
use crate::traits::{DocumentStore, Revision, Snapshot, Subscription};

#[derive(Debug)]
struct Watcher {
    path: DocumentPath,
    sender: mpsc::Sender<Snapshot>,
}

#[derive(Debug)]
struct Tree {
    root: Value,
    revision: Revision,
}

impl Tree {
    fn snapshot(&self, path: &DocumentPath) -> Snapshot {
        Snapshot {
            path: path.clone(),
            revision: self.revision,
            value: value_at(&self.root, path).filter(|v| !is_empty_node(v)).cloned(),
        }
    }
}

/// In-memory document tree.
///
/// - Writes are applied synchronously and notify overlapping subscriptions
///   before returning.
/// - Empty objects and nulls are never stored, as in the hosted store: removing
///   the last child of a node removes the node.
/// - `set_available(false)` simulates a lost connection; `protect(path)`
///   simulates security rules that reject writes below a path.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    tree: RwLock<Tree>,
    watchers: Mutex<Vec<Watcher>>,
    available: AtomicBool,
    protected: RwLock<Vec<DocumentPath>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree {
                root: Value::Object(Map::new()),
                revision: Revision::ZERO,
            }),
            watchers: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            protected: RwLock::new(Vec::new()),
        }
    }

    /// Latest applied revision.
    pub fn revision(&self) -> Revision {
        self.tree.read().map(|t| t.revision).unwrap_or_default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Reject every later write at or below `path` with `PermissionDenied`.
    pub fn protect(&self, path: DocumentPath) {
        if let Ok(mut protected) = self.protected.write() {
            protected.push(path);
        }
    }

    /// Number of live subscriptions (dead ones are pruned on the next write).
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().map(|w| w.len()).unwrap_or(0)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn ensure_writable(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.ensure_available()?;
        let protected = self.protected.read().map_err(|_| StoreError::Poisoned)?;
        if protected.iter().any(|p| p.is_prefix_of(path)) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    /// Apply a batch of writes (all relative to the tree root) as one revision.
    fn apply(&self, notify_at: &DocumentPath, writes: Vec<(DocumentPath, Option<Value>)>) -> Result<Revision, StoreError> {
        self.ensure_writable(notify_at)?;

        let mut tree = self.tree.write().map_err(|_| StoreError::Poisoned)?;
        for (path, value) in writes {
            write_at(&mut tree.root, path.segments(), value.and_then(normalize));
        }
        if !tree.root.is_object() {
            tree.root = Value::Object(Map::new());
        }
        tree.revision = tree.revision.next();

        // Notify while still holding the tree lock so deliveries per watcher
        // stay in revision order.
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|w| {
                if !w.path.overlaps(notify_at) {
                    return true;
                }
                w.sender.send(tree.snapshot(&w.path)).is_ok()
            });
        }

        tracing::trace!(path = %notify_at, revision = tree.revision.get(), "applied write");
        Ok(tree.revision)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, path: &DocumentPath) -> Result<Snapshot, StoreError> {
        self.ensure_available()?;
        let tree = self.tree.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tree.snapshot(path))
    }

    fn set(&self, path: &DocumentPath, value: Value) -> Result<Revision, StoreError> {
        self.apply(path, vec![(path.clone(), Some(value))])
    }

    fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<Revision, StoreError> {
        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            writes.push((path.child(&key)?, Some(value)));
        }
        self.apply(path, writes)
    }

    fn remove(&self, path: &DocumentPath) -> Result<Revision, StoreError> {
        self.apply(path, vec![(path.clone(), None)])
    }

    fn push(&self, path: &DocumentPath, value: Value) -> Result<(String, Revision), StoreError> {
        let key = Uuid::now_v7().simple().to_string();
        let child = path.child(&key)?;
        let revision = self.set(&child, value)?;
        Ok((key, revision))
    }

    fn subscribe(&self, path: &DocumentPath) -> Subscription {
        let (sender, receiver) = mpsc::channel();

        // Hold the tree lock while registering so no write slips between the
        // initial snapshot and the first notification.
        if let Ok(tree) = self.tree.read() {
            if self.is_available() {
                let _ = sender.send(tree.snapshot(path));
            }
            if let Ok(mut watchers) = self.watchers.lock() {
                watchers.push(Watcher {
                    path: path.clone(),
                    sender,
                });
            }
        }

        Subscription::new(path.clone(), receiver)
    }
}

fn value_at<'a>(root: &'a Value, path: &DocumentPath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drop nulls and empty objects; `None` if nothing is left.
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

/// Write (`Some`) or delete (`None`) the node at `segments`, creating
/// intermediate objects and pruning parents left empty.
fn write_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    if rest.is_empty() {
        match value {
            Some(v) => {
                map.insert(head.clone(), v);
            }
            None => map.retain(|k, _| k != head),
        }
        return;
    }

    match map.get_mut(head) {
        Some(child) => write_at(child, rest, value),
        None => {
            if value.is_none() {
                return;
            }
            let mut child = Value::Object(Map::new());
            write_at(&mut child, rest, value);
            map.insert(head.clone(), child);
        }
    }

    if map.get(head).is_some_and(is_empty_node) {
        map.retain(|k, _| k != head);
    }
}
