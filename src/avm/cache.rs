// Wed Jan 15 2026 - Alex

use ahash::AHashMap;
use parking_lot::RwLock;
use std::hash::Hash;

/// Process-lifetime map guarded only around lookup and insert.
///
/// Values are computed outside the lock, so two threads may build the
/// same entry at once. The first insert wins and later ones get the
/// stored value back.
pub struct IdentityCache<K, V> {
    entries: RwLock<AHashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> IdentityCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `value` unless `key` is already present; returns whatever is
    /// stored afterwards.
    pub fn insert_if_absent(&self, key: K, value: V) -> V {
        self.entries.write().entry(key).or_insert(value).clone()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for IdentityCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
