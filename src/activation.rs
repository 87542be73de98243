//! Permanent per-item activation tracking
//!
//! Once a player has correctly echoed an item for the first time it stays
//! "activated" for the rest of the session, across rounds, mistakes, and
//! reloads. Hosts typically render activated items differently on the
//! board, so the set only ever grows; nothing short of an explicit fresh
//! start clears it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::ItemId;

/// The monotonically growing set of items a player has unlocked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Activations {
    /// Activated items in stable identifier order
    items: BTreeSet<ItemId>,
}

impl Activations {
    /// Marks an item as permanently activated
    ///
    /// Returns true if the item was not activated before. Activating an
    /// already-activated item is a no-op, which makes repeated correct
    /// submissions of the same item harmless.
    pub fn activate(&mut self, item: ItemId) -> bool {
        self.items.insert(item)
    }

    /// Returns true if the item has ever been activated
    pub fn is_active(&self, item: &ItemId) -> bool {
        self.items.contains(item)
    }

    /// Returns the number of activated items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no item has been activated yet
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over activated items in stable identifier order
    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }

    /// Forgets every activation, for an explicit fresh start only
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_activation_is_permanent() {
        let mut activations = Activations::default();

        assert!(activations.activate(ItemId::from("ba")));
        assert!(activations.is_active(&ItemId::from("ba")));
        assert!(!activations.is_active(&ItemId::from("na")));
    }

    #[test]
    fn test_reactivation_is_idempotent() {
        let mut activations = Activations::default();

        assert!(activations.activate(ItemId::from("ba")));
        assert!(!activations.activate(ItemId::from("ba")));
        assert_eq!(activations.len(), 1);
    }

    #[test]
    fn test_len_only_grows_with_new_items() {
        let mut activations = Activations::default();
        activations.activate(ItemId::from("ba"));
        activations.activate(ItemId::from("na"));
        activations.activate(ItemId::from("ba"));

        assert_eq!(activations.len(), 2);
        assert!(!activations.is_empty());
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut activations = Activations::default();
        activations.activate(ItemId::from("ba"));

        activations.clear();

        assert!(activations.is_empty());
        assert!(!activations.is_active(&ItemId::from("ba")));
    }

    #[test]
    fn test_serializes_as_a_plain_sorted_list() {
        let mut activations = Activations::default();
        activations.activate(ItemId::from("na"));
        activations.activate(ItemId::from("ba"));

        let serialized = serde_json::to_string(&activations).unwrap();

        assert_eq!(serialized, r#"["ba","na"]"#);

        let deserialized: Activations = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, activations);
    }
}
