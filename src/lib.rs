//! File-backed key-value store that stays correct under many threads *and*
//! many processes.
//!
//! Three layers, each wrapping the next:
//!
//! - [`KeyValueStore`]: a plain in-memory map.
//! - [`PersistentStore`]: reloads the whole file before every call and
//!   writes the whole file back after every mutation. Nothing is cached.
//! - [`SyncStore`]: a readers-writer lock built from a counting semaphore
//!   of reader permits and a write token, either in process memory
//!   ([`ConcurrencyMode::Threaded`]) or as named OS semaphores
//!   ([`ConcurrencyMode::MultiProcess`]).
//!
//! ```rust,no_run
//! use shared_kv::{ConcurrencyMode, DefaultStore};
//!
//! let db = DefaultStore::<String, String>::open("db.json", ConcurrencyMode::MultiProcess).unwrap();
//! db.set("hello".into(), "world".into()).unwrap();
//! assert_eq!(db.get(&"hello".into()).unwrap(), Some("world".into()));
//! ```
//!
//! Locking is local to one machine. Named lock objects outlive the
//! processes that created them; a process killed while holding permits
//! leaves them held until [`LockNames::unlink`] is called.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod lock;
pub mod memory;
mod named;
pub mod persist;
pub mod persistent;
mod semaphore;
pub mod serializer;
pub mod store;

pub use backend::MapBackend;
pub use error::{Error, Result};
pub use lock::{LockNames, LockProvider, DEFAULT_READER_SLOTS};
pub use memory::KeyValueStore;
pub use persistent::PersistentStore;
pub use store::{ConcurrencyMode, SyncStore, SyncStoreBuilder};

/// Default backend: ShardMap.
pub type DefaultBackend<K, V> = shardmap::ShardMap<K, V>;

/// [`SyncStore`] over the default backend.
pub type DefaultStore<K, V> = SyncStore<K, V, DefaultBackend<K, V>>;
