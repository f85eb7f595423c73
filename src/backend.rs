//! Pluggable in-memory maps for the leaf [`KeyValueStore`](crate::KeyValueStore).
//!
//! Implement [`MapBackend`] to bring your own map.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Bounds every key type has to satisfy.
pub trait StoreKey: Hash + Eq + Send + Sync + Clone + Serialize + DeserializeOwned {}
impl<T> StoreKey for T where T: Hash + Eq + Send + Sync + Clone + Serialize + DeserializeOwned {}

/// Bounds every value type has to satisfy.
pub trait StoreValue: Send + Sync + Clone + Serialize + DeserializeOwned {}
impl<T> StoreValue for T where T: Send + Sync + Clone + Serialize + DeserializeOwned {}

/// Map operations the leaf store is built on.
///
/// Every method works with owned values. Backends that keep values behind an
/// `Arc` (like ShardMap) clone on read.
pub trait MapBackend<K: StoreKey, V: StoreValue>: Default + Send + Sync {
    /// Insert a key-value pair, returning the previous value if any.
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Look up a value by key.
    fn get(&self, key: &K) -> Option<V>;

    /// Remove a key, returning its value if it was present.
    fn remove(&self, key: &K) -> Option<V>;

    /// Every entry, cloned out.
    fn entries(&self) -> Vec<(K, V)>;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Check if a key exists without cloning the value.
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Drop all entries.
    fn clear(&self) {
        for (k, _) in self.entries() {
            self.remove(&k);
        }
    }

    /// Build a backend holding exactly `data`.
    fn from_snapshot(data: HashMap<K, V>) -> Self {
        let map = Self::default();
        for (k, v) in data {
            map.insert(k, v);
        }
        map
    }

    /// Copy the contents out as a plain map, the unit of persistence.
    fn to_snapshot(&self) -> HashMap<K, V> {
        let mut out = HashMap::with_capacity(self.entry_count());
        out.extend(self.entries());
        out
    }
}

// ---- ShardMap ----------------------------------------------------------------

impl<K: StoreKey, V: StoreValue> MapBackend<K, V> for shardmap::ShardMap<K, V> {
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.insert(key, value).map(|arc| (*arc).clone())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get(key).map(|arc| (*arc).clone())
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.remove(key).map(|arc| (*arc).clone())
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.iter_snapshot()
            .map(|(k, arc_v)| (k, (*arc_v).clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    // get() hands back an Arc<V>, so this is a refcount bump, not a clone.
    fn contains_key(&self, key: &K) -> bool {
        shardmap::ShardMap::get(self, key).is_some()
    }
}

// ---- RwLock<HashMap> ---------------------------------------------------------

impl<K: StoreKey, V: StoreValue> MapBackend<K, V>
    for parking_lot::RwLock<HashMap<K, V>>
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    fn clear(&self) {
        self.write().clear()
    }

    fn from_snapshot(data: HashMap<K, V>) -> Self {
        parking_lot::RwLock::new(data)
    }

    fn to_snapshot(&self) -> HashMap<K, V> {
        self.read().clone()
    }
}

// ---- DashMap (feature-gated) -------------------------------------------------

#[cfg(feature = "dashmap")]
impl<K: StoreKey, V: StoreValue> MapBackend<K, V> for dashmap::DashMap<K, V> {
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get(key).map(|r| r.value().clone())
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.remove(key).map(|(_, v)| v)
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &K) -> bool {
        dashmap::DashMap::contains_key(self, key)
    }

    fn clear(&self) {
        dashmap::DashMap::clear(self)
    }
}
