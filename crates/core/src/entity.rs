//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products (keyed by barcode) and registry partners (keyed by partner id) are
/// entities; price grids and labels are plain values owned by them.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
