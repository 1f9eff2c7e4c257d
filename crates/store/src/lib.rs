//! `stripmarket-store`: the remote document tree, seen from the marketplace.
//!
//! The hosted store is treated as a key/value document tree addressed by path,
//! with `get`/`set`/`update`/`remove`/`push` and live subscriptions. No query
//! language, no transactions: every mutation is an independent path write.
//!
//! This crate also holds the pieces every consumer of the tree needs:
//! - permissive value coercion (`document`)
//! - the revision merge rule for cached reads and pushes (`cache`)
//! - the root-key layout of a deployment (`layout`)

pub mod cache;
pub mod document;
pub mod error;
pub mod in_memory;
pub mod layout;
pub mod path;
pub mod traits;

pub use cache::Versioned;
pub use error::StoreError;
pub use in_memory::InMemoryDocumentStore;
pub use layout::StoreLayout;
pub use path::DocumentPath;
pub use traits::{DocumentStore, Revision, Snapshot, Subscription};
