//! Per-product, per-partner price grids.
//!
//! - `labels`: month labels derived from a category's anchor date
//! - `grid`: the typed 10-slot price grid and its document form
//! - `grid_store`: cached grids per product, kept in sync with the store
//! - `coordinator`: the user-facing edit flows and their notices

pub mod coordinator;
pub mod error;
pub mod grid;
pub mod grid_store;
pub mod labels;
pub mod notice;

pub use coordinator::{CoordinatorConfig, PartnerPolicy, PriceEditCoordinator, PriceRow, PriceTable};
pub use error::{PriceEditError, PriceGridError};
pub use grid::{PRICE_SLOTS, PriceGrid, PriceSlot, parse_price};
pub use grid_store::{GridFeed, GridStoreConfig, GridView, PriceGridStore, ReconcilePolicy};
pub use labels::{NOT_AVAILABLE, labels};
pub use notice::{Notice, NoticeFeed, NoticeLevel};
