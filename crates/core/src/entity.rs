//! Entity trait: an identity that survives state changes.

/// Something with a stable key, independent of its mutable attributes.
///
/// Inventory items are keyed by their code; the counted quantity and status
/// change over a session, the identity does not.
pub trait Entity {
    /// Strongly-typed key.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the key.
    fn id(&self) -> &Self::Id;

    /// Whether `other` carries the same key.
    fn same_identity(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.id() == other.id()
    }
}
