//! Partners domain module (buyers and wholesalers).
//!
//! The registry is the global list of trading partners a product's price grids
//! can be scoped to. Entries are independent of products: a partner may exist
//! without any grid, and a grid may reference a free-text partner key that has
//! no registry entry.

pub mod error;
pub mod partner;
pub mod registry;

pub use error::RegistryError;
pub use partner::{Address, NewPartner, Partner, PartnerKind, PartnerUpdate, UNNAMED};
pub use registry::{PartnerRegistry, RegistryFeed};
