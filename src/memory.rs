//! The leaf layer: a plain in-memory map with no persistence and no locking
//! of its own.

use crate::backend::{MapBackend, StoreKey, StoreValue};
use std::collections::HashMap;
use std::marker::PhantomData;

/// In-memory key-value map.
///
/// [`PersistentStore`](crate::PersistentStore) builds one of these from the
/// backing file for every call and discards it afterwards, so an instance is
/// only ever owned by the call that created it.
pub struct KeyValueStore<K, V, M> {
    map: M,
    _marker: PhantomData<(K, V)>,
}

impl<K: StoreKey, V: StoreValue, M: MapBackend<K, V>> KeyValueStore<K, V, M> {
    /// Empty store.
    pub fn new() -> Self {
        Self::from_snapshot(HashMap::new())
    }

    /// Store holding exactly the entries of `data`.
    pub fn from_snapshot(data: HashMap<K, V>) -> Self {
        Self {
            map: M::from_snapshot(data),
            _marker: PhantomData,
        }
    }

    /// Insert or overwrite, returning the value that was replaced.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// The value for `key`, or `None` if it was never set.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get(key)
    }

    /// Remove `key` and hand back its value. Absent keys leave the store
    /// untouched and return `None`.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.entry_count()
    }

    /// `true` when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.map.clear()
    }

    /// Copy of the full mapping.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.map.to_snapshot()
    }
}

impl<K: StoreKey, V: StoreValue, M: MapBackend<K, V>> Default for KeyValueStore<K, V, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, M> std::fmt::Debug for KeyValueStore<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore").finish_non_exhaustive()
    }
}
