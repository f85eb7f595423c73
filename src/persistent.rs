//! File-backed layer: every call reloads the whole snapshot and every
//! mutation writes the whole snapshot back.

use crate::backend::{MapBackend, StoreKey, StoreValue};
use crate::error::Result;
use crate::memory::KeyValueStore;
use crate::persist::{atomic_write, load};
use crate::serializer::{JsonSerializer, Serializer};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Key-value store whose only state is the backing file.
///
/// Nothing is cached between calls: `get` reloads, `set`/`delete` reload,
/// mutate and persist. That makes every call see what other participants
/// wrote before it, at the price of a full decode (and, for writes, a full
/// encode) per operation.
///
/// This type does no locking. Concurrent use from several participants must
/// go through [`SyncStore`](crate::SyncStore).
pub struct PersistentStore<K, V, M> {
    path: PathBuf,
    serializer: JsonSerializer,
    _marker: PhantomData<fn() -> (K, V, M)>,
}

impl<K: StoreKey, V: StoreValue, M: MapBackend<K, V>> PersistentStore<K, V, M> {
    /// Open the store at `path`. A missing file is created holding an empty
    /// snapshot; an existing one is loaded, and must decode.
    pub fn open(path: impl AsRef<Path>, serializer: JsonSerializer) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            serializer,
            _marker: PhantomData,
        };

        if store.path.is_file() {
            let entries = store.reload()?.len();
            tracing::debug!(path = %store.path.display(), entries, "loaded existing store");
        } else {
            store.persist(&KeyValueStore::new())?;
            tracing::debug!(path = %store.path.display(), "created empty store");
        }
        Ok(store)
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- reads ----

    /// Reload, then look up `key`.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.reload()?.get(key))
    }

    /// Reload, then check for `key`.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.reload()?.contains_key(key))
    }

    /// Reload, then count entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.reload()?.len())
    }

    /// Reload, then check for emptiness.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.reload()?.is_empty())
    }

    /// Reload, then return the full mapping.
    pub fn snapshot(&self) -> Result<HashMap<K, V>> {
        Ok(self.reload()?.snapshot())
    }

    // ---- writes ----

    /// Reload, insert or overwrite, persist.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.transaction(|mem| {
            mem.set(key, value);
        })
    }

    /// Reload, remove `key`, persist. Returns the removed value.
    pub fn delete(&self, key: &K) -> Result<Option<V>> {
        self.transaction(|mem| mem.delete(key))
    }

    /// Reload, drop every entry, persist.
    pub fn clear(&self) -> Result<()> {
        self.transaction(|mem| mem.clear())
    }

    /// Reload, insert every pair, persist once.
    pub fn extend<I>(&self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.transaction(|mem| {
            for (k, v) in iter {
                mem.set(k, v);
            }
        })
    }

    /// Reload, mutate the value at `key` in place, persist. Returns `false`
    /// without touching the file if the key doesn't exist.
    pub fn update<F>(&self, key: &K, f: F) -> Result<bool>
    where
        F: FnOnce(&mut V),
    {
        let mem = self.reload()?;
        match mem.get(key) {
            Some(mut v) => {
                f(&mut v);
                mem.set(key.clone(), v);
                self.persist(&mem)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reload, hand the in-memory store to `f`, persist whatever it left
    /// behind.
    pub fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&KeyValueStore<K, V, M>) -> R,
    {
        let mem = self.reload()?;
        let out = f(&mem);
        self.persist(&mem)?;
        Ok(out)
    }

    // ---- internal ----

    fn reload(&self) -> Result<KeyValueStore<K, V, M>> {
        let data = load::<K, V, _>(&self.path, &self.serializer)?;
        Ok(KeyValueStore::from_snapshot(data))
    }

    fn persist(&self, mem: &KeyValueStore<K, V, M>) -> Result<()> {
        let bytes = self.serializer.serialize(&mem.snapshot())?;
        atomic_write(&self.path, &bytes)
    }
}

impl<K, V, M> std::fmt::Debug for PersistentStore<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
