//! Id-keyed entity storage.
//!
//! Registries hand out monotonically increasing identifiers and iterate in
//! identifier order, which is the iteration order every resolution step
//! relies on for determinism.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Storage for one kind of entity, keyed by a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry<K: Ord, V> {
    /// Map of ID to entity data.
    entries: BTreeMap<K, V>,
    /// Next ID to assign.
    next_id: u64,
}

impl<K: Ord, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Copy + Ord + From<u64>,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity built from its freshly allocated ID.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> V) -> K {
        let id = K::from(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, build(id));
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: K) -> Option<V> {
        self.entries.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: K) -> Option<&V> {
        self.entries.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.entries.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All IDs in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<K> {
        self.entries.keys().copied().collect()
    }

    /// Iterate over all entities in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Iterate over all entity values in ID order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Iterate mutably over all entities in ID order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }

    /// Drop every entity for which `keep` returns `false`.
    ///
    /// Returns the removed IDs in ascending order.
    pub fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) -> Vec<K> {
        let removed: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, v)| !keep(v))
            .map(|(k, _)| *k)
            .collect();
        for id in &removed {
            self.entries.remove(id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UnitId;

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry: Registry<UnitId, &str> = Registry::new();
        let a = registry.insert_with(|_| "a");
        let b = registry.insert_with(|_| "b");
        assert_eq!(a, UnitId(1));
        assert_eq!(b, UnitId(2));

        registry.remove(a);
        let c = registry.insert_with(|_| "c");
        assert_eq!(c, UnitId(3), "removed ids are never reused");
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut registry: Registry<UnitId, u32> = Registry::new();
        for v in [30, 10, 20] {
            registry.insert_with(|_| v);
        }
        assert_eq!(registry.ids(), vec![UnitId(1), UnitId(2), UnitId(3)]);
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![30, 10, 20]);
    }

    #[test]
    fn test_retain_reports_removed() {
        let mut registry: Registry<UnitId, u32> = Registry::new();
        for v in [1, 2, 3, 4] {
            registry.insert_with(|_| v);
        }
        let removed = registry.retain(|v| v % 2 == 0);
        assert_eq!(removed, vec![UnitId(1), UnitId(3)]);
        assert_eq!(registry.len(), 2);
    }
}
