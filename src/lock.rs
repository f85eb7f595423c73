//! Semaphore-only readers-writer lock.
//!
//! A pool of `N` reader permits and one write token. Readers take one permit.
//! Writers take the token, then drain the pool one permit at a time, which
//! waits out every active reader and keeps new ones from getting in. Only
//! the token holder ever drains, so two writers can't each end up holding
//! part of the pool.
//!
//! Both guards release what they hold on drop, on every exit path.
//!
//! All participants on one lock must agree on `N`. The drain only excludes
//! readers if it takes every permit there is, so opening a lock with a
//! different `N` than the one it was created with is a
//! [`Config`](Error::Config) error.

use crate::error::{Error, Result};
use crate::named::{self, NamedSemaphore};
use crate::semaphore::Semaphore;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Weak};

/// Reader slots used when the builder isn't told otherwise.
pub const DEFAULT_READER_SLOTS: usize = 10;

/// OS-level names of the synchronization objects guarding one store in
/// multi-process mode.
///
/// Every participant that opens the same backing file has to use the same
/// names. [`LockNames::for_path`] derives them from the file path so that
/// happens by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockNames {
    /// Counting semaphore holding the reader permits.
    pub permits: String,
    /// Binary semaphore acting as the write token.
    pub write_token: String,
    /// Semaphore whose count records the pool size `N`. Only read and
    /// written while holding the write token.
    pub capacity: String,
}

impl LockNames {
    /// Explicit names. Each must start with `/`, contain no other `/` and
    /// be at most 31 bytes long.
    pub fn new(
        permits: impl Into<String>,
        write_token: impl Into<String>,
        capacity: impl Into<String>,
    ) -> Result<Self> {
        let names = Self {
            permits: permits.into(),
            write_token: write_token.into(),
            capacity: capacity.into(),
        };
        names.validate()?;
        Ok(names)
    }

    /// Deterministic names for the store at `path`.
    ///
    /// The parent directory is canonicalised and the file name appended, so
    /// the result is the same before and after the file is created and no
    /// matter which working directory a participant runs from.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        let digest = Sha256::digest(identity_bytes(path));
        let mut hex = String::with_capacity(16);
        for byte in &digest[..8] {
            use std::fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        Self {
            permits: format!("/skv-p-{hex}"),
            write_token: format!("/skv-w-{hex}"),
            capacity: format!("/skv-c-{hex}"),
        }
    }

    /// Remove the named objects from the system. Stores that are still open
    /// keep their handles; later opens start from fresh counts.
    pub fn unlink(&self) -> Result<()> {
        named::unlink(&self.permits)?;
        named::unlink(&self.capacity)?;
        named::unlink(&self.write_token)
    }

    fn validate(&self) -> Result<()> {
        if self.permits == self.write_token
            || self.permits == self.capacity
            || self.write_token == self.capacity
        {
            return Err(Error::Config("lock objects need distinct names".into()));
        }
        named::validate_name(&self.permits)?;
        named::validate_name(&self.write_token)?;
        named::validate_name(&self.capacity)
    }
}

fn identity_bytes(path: &Path) -> Vec<u8> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent = std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    let full = match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    };
    full.to_string_lossy().as_bytes().to_vec()
}

/// Where the permit pool and write token live.
#[derive(Debug)]
pub enum LockProvider {
    /// Plain in-memory primitives shared by every handle on the same file
    /// in this process.
    InProcess(Arc<InProcessLocks>),
    /// Named OS semaphores; any process that opens the same names joins in.
    CrossProcessNamed(NamedLocks),
}

/// Lock state for [`LockProvider::InProcess`].
#[derive(Debug)]
pub struct InProcessLocks {
    slots: usize,
    permits: Semaphore,
    write_token: Semaphore,
}

impl InProcessLocks {
    fn new(slots: usize) -> Self {
        Self {
            slots,
            permits: Semaphore::new(slots),
            write_token: Semaphore::new(1),
        }
    }
}

/// In-process lock state of every open store, by backing file identity.
static IN_PROCESS: Mutex<BTreeMap<Vec<u8>, Weak<InProcessLocks>>> =
    parking_lot::const_mutex(BTreeMap::new());

/// Lock state for [`LockProvider::CrossProcessNamed`]. The handles are
/// closed when this is dropped; the named objects themselves stay.
#[derive(Debug)]
pub struct NamedLocks {
    names: LockNames,
    slots: usize,
    permits: NamedSemaphore,
    write_token: NamedSemaphore,
}

impl LockProvider {
    /// Fresh in-process lock state with `slots` reader permits, not shared
    /// with anything else.
    pub fn in_process(slots: usize) -> Result<Self> {
        check_slots(slots)?;
        Ok(LockProvider::InProcess(Arc::new(InProcessLocks::new(slots))))
    }

    /// In-process lock state for the file at `path`. Every handle on the
    /// same file in this process gets the same state while any of them is
    /// alive; asking for a different `slots` than the live state has is an
    /// error.
    pub fn in_process_for_path(path: &Path, slots: usize) -> Result<Self> {
        check_slots(slots)?;
        let key = identity_bytes(path);
        let mut registry = IN_PROCESS.lock();
        registry.retain(|_, locks| locks.strong_count() > 0);
        if let Some(locks) = registry.get(&key).and_then(Weak::upgrade) {
            if locks.slots != slots {
                return Err(slot_mismatch(&path.display().to_string(), locks.slots, slots));
            }
            return Ok(LockProvider::InProcess(locks));
        }
        let locks = Arc::new(InProcessLocks::new(slots));
        registry.insert(key, Arc::downgrade(&locks));
        Ok(LockProvider::InProcess(locks))
    }

    /// Open (creating if needed) the named objects in `names`.
    ///
    /// The first participant records `slots` alongside the pool; later ones
    /// must pass the same value or get [`Error::Config`].
    pub fn cross_process(names: LockNames, slots: usize) -> Result<Self> {
        check_slots(slots)?;
        names.validate()?;
        let write_token = NamedSemaphore::open(&names.write_token, 1)?;
        write_token.acquire()?;
        let opened = open_pool(&names, slots);
        let released = write_token.release();
        let permits = opened?;
        released?;
        Ok(LockProvider::CrossProcessNamed(NamedLocks {
            names,
            slots,
            permits,
            write_token,
        }))
    }

    /// Names of the OS objects, for cross-process locks.
    #[must_use]
    pub fn names(&self) -> Option<&LockNames> {
        match self {
            LockProvider::InProcess(_) => None,
            LockProvider::CrossProcessNamed(locks) => Some(&locks.names),
        }
    }

    /// Size of the permit pool.
    #[must_use]
    pub fn slots(&self) -> usize {
        match self {
            LockProvider::InProcess(locks) => locks.slots,
            LockProvider::CrossProcessNamed(locks) => locks.slots,
        }
    }

    /// Take one reader permit. Blocks while a writer holds the whole pool
    /// or all permits are in use.
    pub fn read(&self) -> Result<ReadGuard<'_>> {
        self.acquire_permit()?;
        tracing::trace!("reader permit acquired");
        Ok(ReadGuard { locks: self })
    }

    /// Take the write token, then every permit in the pool.
    pub fn write(&self) -> Result<WriteGuard<'_>> {
        self.acquire_write_token()?;
        let mut guard = WriteGuard {
            locks: self,
            drained: 0,
        };
        for _ in 0..self.slots() {
            // On error the guard drops here and gives back what it holds.
            self.acquire_permit()?;
            guard.drained += 1;
        }
        tracing::trace!(drained = guard.drained, "permit pool drained");
        Ok(guard)
    }

    fn acquire_permit(&self) -> Result<()> {
        match self {
            LockProvider::InProcess(locks) => {
                locks.permits.acquire();
                Ok(())
            }
            LockProvider::CrossProcessNamed(locks) => locks.permits.acquire(),
        }
    }

    fn release_permit(&self) -> Result<()> {
        match self {
            LockProvider::InProcess(locks) => locks.permits.release(),
            LockProvider::CrossProcessNamed(locks) => locks.permits.release(),
        }
    }

    fn acquire_write_token(&self) -> Result<()> {
        match self {
            LockProvider::InProcess(locks) => {
                locks.write_token.acquire();
                Ok(())
            }
            LockProvider::CrossProcessNamed(locks) => locks.write_token.acquire(),
        }
    }

    fn release_write_token(&self) -> Result<()> {
        match self {
            LockProvider::InProcess(locks) => locks.write_token.release(),
            LockProvider::CrossProcessNamed(locks) => locks.write_token.release(),
        }
    }
}

/// Open the permit pool, checking its recorded size. Caller holds the write
/// token, so nobody else is creating or sizing the pool meanwhile.
fn open_pool(names: &LockNames, slots: usize) -> Result<NamedSemaphore> {
    if NamedSemaphore::create_new(&names.capacity, slots)?.is_some() {
        // A pool without a size record is left over from an interrupted
        // open; start it over.
        named::unlink(&names.permits)?;
        return NamedSemaphore::open(&names.permits, slots);
    }
    let recorded = NamedSemaphore::open(&names.capacity, slots)?.count_free()?;
    if recorded != slots {
        return Err(slot_mismatch(&names.permits, recorded, slots));
    }
    NamedSemaphore::open(&names.permits, slots)
}

fn slot_mismatch(what: &str, existing: usize, requested: usize) -> Error {
    Error::Config(format!(
        "{what} is locked with {existing} reader slots, not {requested}"
    ))
}

fn check_slots(slots: usize) -> Result<()> {
    if slots == 0 {
        return Err(Error::Config("need at least one reader slot".into()));
    }
    Ok(())
}

/// One reader permit. Released on drop.
#[must_use = "the permit is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReadGuard<'a> {
    locks: &'a LockProvider,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.locks.release_permit() {
            tracing::error!(%err, "failed to release reader permit");
        }
    }
}

/// The write token plus every permit drained so far. Released on drop,
/// permits first.
#[must_use = "exclusive access ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WriteGuard<'a> {
    locks: &'a LockProvider,
    drained: usize,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        for _ in 0..self.drained {
            if let Err(err) = self.locks.release_permit() {
                tracing::error!(%err, "failed to release drained permit");
            }
        }
        if let Err(err) = self.locks.release_write_token() {
            tracing::error!(%err, "failed to release write token");
        }
        tracing::trace!(released = self.drained, "write lock released");
    }
}
