//! Named OS semaphores, reachable by every process on the machine that
//! knows the name.
//!
//! Backed by POSIX `sem_open`. The kernel object outlives the processes that
//! use it; [`unlink`] removes the name. Initial counts only apply when the
//! object is first created, so every participant must agree on them.

use crate::error::{Error, Result};

#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::io;

/// Longest name accepted, leading slash included. macOS caps POSIX
/// semaphore names at 31 bytes.
pub(crate) const MAX_NAME_LEN: usize = 31;

/// Check that `name` is usable as a POSIX semaphore name on every platform
/// we build for: one leading slash, no other slashes, short.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let rest = name
        .strip_prefix('/')
        .ok_or_else(|| Error::Config(format!("lock name {name:?} must start with '/'")))?;
    if rest.is_empty() || rest.contains('/') || rest.contains('\0') {
        return Err(Error::Config(format!("lock name {name:?} is not a valid object name")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::Config(format!(
            "lock name {name:?} is longer than {MAX_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

/// An open handle on a named counting semaphore. Closed on drop.
#[derive(Debug)]
pub(crate) struct NamedSemaphore {
    name: String,
    #[cfg(unix)]
    handle: *mut libc::sem_t,
}

// The handle is a process-wide pointer into a shared mapping; sem_wait and
// sem_post are thread-safe on it.
#[cfg(unix)]
unsafe impl Send for NamedSemaphore {}
#[cfg(unix)]
unsafe impl Sync for NamedSemaphore {}

#[cfg(unix)]
impl NamedSemaphore {
    /// Open `name`, creating it with `initial` permits if it doesn't exist.
    pub(crate) fn open(name: &str, initial: usize) -> Result<Self> {
        Self::open_with(name, initial, libc::O_CREAT)?
            .ok_or_else(|| Error::Lock(format!("semaphore {name} could not be opened")))
    }

    /// Create `name` with `initial` permits. `None` if it already exists.
    pub(crate) fn create_new(name: &str, initial: usize) -> Result<Option<Self>> {
        Self::open_with(name, initial, libc::O_CREAT | libc::O_EXCL)
    }

    fn open_with(name: &str, initial: usize, flags: libc::c_int) -> Result<Option<Self>> {
        validate_name(name)?;
        let initial = libc::c_uint::try_from(initial)
            .map_err(|_| Error::Config(format!("{initial} permits is too many")))?;
        let c_name =
            CString::new(name).map_err(|e| Error::Config(format!("lock name {name:?}: {e}")))?;
        let mode = (libc::S_IRUSR | libc::S_IWUSR) as libc::mode_t;
        let handle = unsafe { libc::sem_open(c_name.as_ptr(), flags, mode as libc::c_uint, initial) };
        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if flags & libc::O_EXCL != 0 && err.raw_os_error() == Some(libc::EEXIST) {
                return Ok(None);
            }
            return Err(sem_error("open", name, err));
        }
        tracing::debug!(name, "opened named semaphore");
        Ok(Some(Self {
            name: name.to_string(),
            handle,
        }))
    }

    /// Take one permit, blocking until one is free.
    pub(crate) fn acquire(&self) -> Result<()> {
        loop {
            let rc = unsafe { libc::sem_wait(self.handle) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(sem_error("wait on", &self.name, err));
        }
    }

    /// Take one permit if one is free right now.
    pub(crate) fn try_acquire(&self) -> Result<bool> {
        loop {
            let rc = unsafe { libc::sem_trywait(self.handle) };
            if rc == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(code) if code == libc::EAGAIN => return Ok(false),
                Some(code) if code == libc::EINTR => continue,
                _ => return Err(sem_error("try-wait on", &self.name, err)),
            }
        }
    }

    /// Count the free permits by taking them all and giving them back.
    /// Only meaningful while nobody else can touch the semaphore.
    pub(crate) fn count_free(&self) -> Result<usize> {
        let mut taken = 0;
        while self.try_acquire()? {
            taken += 1;
        }
        for _ in 0..taken {
            self.release()?;
        }
        Ok(taken)
    }

    /// Give one permit back.
    pub(crate) fn release(&self) -> Result<()> {
        let rc = unsafe { libc::sem_post(self.handle) };
        if rc != 0 {
            return Err(sem_error("post", &self.name, io::Error::last_os_error()));
        }
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.handle);
        }
    }
}

/// Remove the semaphore called `name`. Open handles keep working; the next
/// `open` creates a fresh object. A name that doesn't exist is not an error.
#[cfg(unix)]
pub(crate) fn unlink(name: &str) -> Result<()> {
    validate_name(name)?;
    let c_name =
        CString::new(name).map_err(|e| Error::Config(format!("lock name {name:?}: {e}")))?;
    let rc = unsafe { libc::sem_unlink(c_name.as_ptr()) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ENOENT) {
            return Err(sem_error("unlink", name, err));
        }
    }
    tracing::debug!(name, "unlinked named semaphore");
    Ok(())
}

#[cfg(unix)]
fn sem_error(action: &str, name: &str, err: io::Error) -> Error {
    Error::Lock(format!("failed to {action} semaphore {name}: {err}"))
}

#[cfg(not(unix))]
impl NamedSemaphore {
    pub(crate) fn open(name: &str, _initial: usize) -> Result<Self> {
        validate_name(name)?;
        Err(unsupported())
    }

    pub(crate) fn create_new(name: &str, _initial: usize) -> Result<Option<Self>> {
        validate_name(name)?;
        Err(unsupported())
    }

    pub(crate) fn count_free(&self) -> Result<usize> {
        Err(unsupported())
    }

    pub(crate) fn acquire(&self) -> Result<()> {
        Err(unsupported())
    }

    pub(crate) fn release(&self) -> Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(unix))]
pub(crate) fn unlink(name: &str) -> Result<()> {
    validate_name(name)?;
    Err(unsupported())
}

#[cfg(not(unix))]
fn unsupported() -> Error {
    Error::Lock("named semaphores are not available on this platform".into())
}
