//! Disk I/O helpers: strict whole-file load and atomic write.
//!
//! The rename-over approach is close to atomic on most platforms. On NTFS
//! (Windows) it's reliable; on FAT32 or network shares there are no hard
//! guarantees.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Reads and deserializes the file at `path`.
///
/// Unlike a first open, a reload has no fallback: a missing file is an
/// [`Error::Io`] and an empty one fails to decode.
pub fn load<K, V, S>(path: &Path, serializer: &S) -> Result<HashMap<K, V>>
where
    K: for<'de> Deserialize<'de> + Eq + std::hash::Hash,
    V: for<'de> Deserialize<'de>,
    S: Serializer,
{
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Io(format!("reading {}: {e}", path.display())))?;
    serializer.deserialize(&bytes)
}

/// Write `bytes` to a fresh temp file next to `path`, fsync it, then rename
/// over `path`. Readers see either the old snapshot or the new one, never a
/// prefix. Every call gets its own temp file, so concurrent writers can't
/// truncate each other's half-written snapshot.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(std::io::Error::from)?;
    Ok(())
}
