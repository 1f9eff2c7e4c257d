//! Document store abstraction (mechanics only).
//!
//! The store is the source of truth; everything the marketplace keeps in memory
//! is a cache of it. Two kinds of data arrive from the store:
//!
//! - **one-shot reads** (`get`), answered once
//! - **live snapshots** (`subscribe`), delivered whenever a watched subtree changes
//!
//! Both carry the store [`Revision`] they reflect, so a cache can tell a stale
//! read from a newer push regardless of arrival order.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::path::DocumentPath;

/// Store-wide write counter. Strictly increases with every applied write.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub const ZERO: Revision = Revision(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for Revision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The value of a path as of a revision (`None` = nothing stored there).
///
/// A snapshot at revision `R` reflects every write with revision `<= R`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub revision: Revision,
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Value of a direct child, if present.
    pub fn child(&self, key: &str) -> Option<&Value> {
        self.value.as_ref().and_then(|v| v.get(key))
    }
}

/// A live subscription to a subtree.
///
/// Receives an initial snapshot, then one snapshot per write that touches the
/// subtree. Dropping the subscription unsubscribes; requests already in flight
/// are not cancelled.
///
/// Subscriptions are designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription {
    path: DocumentPath,
    receiver: Receiver<Snapshot>,
}

impl Subscription {
    pub fn new(path: DocumentPath, receiver: Receiver<Snapshot>) -> Self {
        Self { path, receiver }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// Block until the next snapshot is available.
    pub fn recv(&self) -> Result<Snapshot, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot without blocking.
    pub fn try_recv(&self) -> Result<Snapshot, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Snapshot, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything delivered so far, without blocking.
    pub fn pending(&self) -> Vec<Snapshot> {
        self.receiver.try_iter().collect()
    }
}

/// Key/value document tree (hosted real-time database, or an in-process stand-in).
///
/// Writes return the revision they were applied at. There is no multi-writer
/// conflict resolution: last write wins.
pub trait DocumentStore: Send + Sync {
    /// One-shot read of a path.
    fn get(&self, path: &DocumentPath) -> Result<Snapshot, StoreError>;

    /// Replace the value at `path` (`Value::Null` removes it).
    fn set(&self, path: &DocumentPath, value: Value) -> Result<Revision, StoreError>;

    /// Write several direct children of `path` at once, leaving siblings untouched.
    fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<Revision, StoreError>;

    /// Delete `path` and its entire subtree.
    fn remove(&self, path: &DocumentPath) -> Result<Revision, StoreError>;

    /// Store `value` under a freshly generated, time-ordered child key of `path`.
    fn push(&self, path: &DocumentPath, value: Value) -> Result<(String, Revision), StoreError>;

    /// Watch a subtree.
    fn subscribe(&self, path: &DocumentPath) -> Subscription;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, path: &DocumentPath) -> Result<Snapshot, StoreError> {
        (**self).get(path)
    }

    fn set(&self, path: &DocumentPath, value: Value) -> Result<Revision, StoreError> {
        (**self).set(path, value)
    }

    fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<Revision, StoreError> {
        (**self).update(path, fields)
    }

    fn remove(&self, path: &DocumentPath) -> Result<Revision, StoreError> {
        (**self).remove(path)
    }

    fn push(&self, path: &DocumentPath, value: Value) -> Result<(String, Revision), StoreError> {
        (**self).push(path, value)
    }

    fn subscribe(&self, path: &DocumentPath) -> Subscription {
        (**self).subscribe(path)
    }
}
