//! Synchronized store, its builder, and the concurrency mode switch.

use crate::backend::{MapBackend, StoreKey, StoreValue};
use crate::error::Result;
use crate::lock::{LockNames, LockProvider, DEFAULT_READER_SLOTS};
use crate::memory::KeyValueStore;
use crate::persistent::PersistentStore;
use crate::serializer::JsonSerializer;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Who shares the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Threads of one process. Locks live in process memory and are shared
    /// by every handle opened on the same file, so threads can share one
    /// [`SyncStore`] through an `Arc` or each open their own.
    #[default]
    Threaded,
    /// Independent OS processes, each opening the store itself. Locks are
    /// named OS semaphores found by name, so processes don't need to be
    /// related.
    MultiProcess,
}

/// File-backed key-value store that many threads or processes can use at
/// once.
///
/// Reads (`get`, `contains_key`, `len`, `snapshot`) hold one of `N` reader
/// permits. Writes (`set`, `delete`, `clear`, `extend`, `update`,
/// `transaction`) hold the write token and all `N` permits. Every call
/// reloads the backing file, so a call always sees the latest write from
/// any participant.
///
/// Separate calls are not atomic together: `get` followed by `set` can lose
/// another participant's write in between. Use [`update`](Self::update) or
/// [`transaction`](Self::transaction) for read-modify-write.
pub struct SyncStore<K, V, M> {
    inner: PersistentStore<K, V, M>,
    locks: LockProvider,
    mode: ConcurrencyMode,
}

impl<K: StoreKey, V: StoreValue, M: MapBackend<K, V>> SyncStore<K, V, M> {
    /// Open (or create) the store at `path` with default settings.
    pub fn open(path: impl AsRef<Path>, mode: ConcurrencyMode) -> Result<Self> {
        Self::builder(path).mode(mode).build()
    }

    /// Start configuring a new store. Call [`.build()`](SyncStoreBuilder::build)
    /// when ready.
    pub fn builder(path: impl AsRef<Path>) -> SyncStoreBuilder<K, V, M> {
        SyncStoreBuilder::new(path)
    }

    // ---- reads ----

    /// Get the value for `key`, or `None` if absent.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let _permit = self.locks.read()?;
        self.inner.get(key)
    }

    /// `true` if the key exists.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        let _permit = self.locks.read()?;
        self.inner.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize> {
        let _permit = self.locks.read()?;
        self.inner.len()
    }

    /// `true` when the store has no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Full copy of the current mapping.
    pub fn snapshot(&self) -> Result<HashMap<K, V>> {
        let _permit = self.locks.read()?;
        self.inner.snapshot()
    }

    // ---- writes ----

    /// Insert or overwrite `key`.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        let _exclusive = self.locks.write()?;
        self.inner.set(key, value)
    }

    /// Remove a key, returning its value if it was present. Removing an
    /// absent key still rewrites the (unchanged) file.
    pub fn delete(&self, key: &K) -> Result<Option<V>> {
        let _exclusive = self.locks.write()?;
        self.inner.delete(key)
    }

    /// Drop all entries from the store.
    pub fn clear(&self) -> Result<()> {
        let _exclusive = self.locks.write()?;
        self.inner.clear()
    }

    /// Bulk-insert from an iterator with a single reload and a single write.
    pub fn extend<I>(&self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let _exclusive = self.locks.write()?;
        self.inner.extend(iter)
    }

    /// Mutate the value at `key` in place, atomically with respect to every
    /// other participant. Returns `false` if the key doesn't exist (nothing
    /// is written in that case).
    pub fn update<F>(&self, key: &K, f: F) -> Result<bool>
    where
        F: FnOnce(&mut V),
    {
        let _exclusive = self.locks.write()?;
        self.inner.update(key, f)
    }

    /// Run `f` against a freshly loaded copy of the store while holding
    /// exclusive access, then persist whatever it left behind.
    ///
    /// ```rust,no_run
    /// use shared_kv::{ConcurrencyMode, DefaultStore};
    ///
    /// let db = DefaultStore::<String, u64>::open("counters.json", ConcurrencyMode::Threaded).unwrap();
    /// db.transaction(|mem| {
    ///     let hits = mem.get(&"hits".to_string()).unwrap_or(0);
    ///     mem.set("hits".into(), hits + 1);
    /// })
    /// .unwrap();
    /// ```
    pub fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&KeyValueStore<K, V, M>) -> R,
    {
        let _exclusive = self.locks.write()?;
        self.inner.transaction(f)
    }

    // ---- accessors ----

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Mode the store was opened in.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Size of the reader permit pool.
    #[must_use]
    pub fn reader_slots(&self) -> usize {
        self.locks.slots()
    }

    /// Names of the OS lock objects, in multi-process mode.
    #[must_use]
    pub fn lock_names(&self) -> Option<&LockNames> {
        self.locks.names()
    }
}

impl<K, V, M> std::fmt::Debug for SyncStore<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("inner", &self.inner)
            .field("mode", &self.mode)
            .field("locks", &self.locks)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`SyncStore`].
///
/// ```rust,no_run
/// use shared_kv::{ConcurrencyMode, SyncStore};
/// use shardmap::ShardMap;
///
/// let db = SyncStore::<String, i32, ShardMap<String, i32>>::builder("db.json")
///     .mode(ConcurrencyMode::MultiProcess)
///     .reader_slots(4)
///     .pretty(true)
///     .build()
///     .unwrap();
/// ```
pub struct SyncStoreBuilder<K, V, M> {
    path: PathBuf,
    mode: ConcurrencyMode,
    reader_slots: usize,
    lock_names: Option<LockNames>,
    pretty: bool,
    _marker: PhantomData<fn() -> (K, V, M)>,
}

impl<K: StoreKey, V: StoreValue, M: MapBackend<K, V>> SyncStoreBuilder<K, V, M> {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode: ConcurrencyMode::default(),
            reader_slots: DEFAULT_READER_SLOTS,
            lock_names: None,
            pretty: false,
            _marker: PhantomData,
        }
    }

    /// Threads or processes (default: [`ConcurrencyMode::Threaded`]).
    pub fn mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    /// How many readers may hold the store at once (default: 10). Every
    /// handle on the same lock must use the same value; `build` fails with
    /// [`Error::Config`](crate::Error::Config) otherwise.
    pub fn reader_slots(mut self, slots: usize) -> Self {
        self.reader_slots = slots;
        self
    }

    /// Use these OS object names instead of ones derived from the path.
    /// Ignored in threaded mode.
    pub fn lock_names(mut self, names: LockNames) -> Self {
        self.lock_names = Some(names);
        self
    }

    /// Write human-readable JSON with indentation (default: compact).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Set up the locks, then load (or create) the backing file under
    /// exclusive access.
    pub fn build(self) -> Result<SyncStore<K, V, M>> {
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };

        let locks = match self.mode {
            ConcurrencyMode::Threaded => {
                LockProvider::in_process_for_path(&self.path, self.reader_slots)?
            }
            ConcurrencyMode::MultiProcess => {
                let names = self
                    .lock_names
                    .unwrap_or_else(|| LockNames::for_path(&self.path));
                LockProvider::cross_process(names, self.reader_slots)?
            }
        };

        // Two participants creating the same missing file must not race.
        let inner = {
            let _exclusive = locks.write()?;
            PersistentStore::open(&self.path, serializer)?
        };

        tracing::debug!(
            path = %self.path.display(),
            mode = ?self.mode,
            reader_slots = self.reader_slots,
            "store opened"
        );

        Ok(SyncStore {
            inner,
            locks,
            mode: self.mode,
        })
    }
}

impl<K, V, M> std::fmt::Debug for SyncStoreBuilder<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStoreBuilder")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("reader_slots", &self.reader_slots)
            .field("lock_names", &self.lock_names)
            .field("pretty", &self.pretty)
            .finish()
    }
}
