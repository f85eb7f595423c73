//! Snapshot encoding. Defaults to JSON via serde_json.
//!
//! The on-disk format is always a whole-map document: there is no record
//! framing, so a truncated or garbled file fails to decode as a unit.
//! Implement [`Serializer`] if you need a different format.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Converts full store snapshots to/from bytes.
pub trait Serializer: Send + Sync {
    /// Encode a snapshot to bytes.
    fn serialize<K, V>(&self, data: &HashMap<K, V>) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize;

    /// Decode bytes back into a snapshot.
    fn deserialize<K, V>(&self, bytes: &[u8]) -> Result<HashMap<K, V>>
    where
        K: for<'de> Deserialize<'de> + Eq + std::hash::Hash,
        V: for<'de> Deserialize<'de>;
}

/// JSON serializer with optional pretty-printing.
///
/// Keys end up as JSON object keys, so they must serialize as strings or
/// integers.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON with indentation.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize<K, V>(&self, data: &HashMap<K, V>) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize,
    {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize<K, V>(&self, bytes: &[u8]) -> Result<HashMap<K, V>>
    where
        K: for<'de> Deserialize<'de> + Eq + std::hash::Hash,
        V: for<'de> Deserialize<'de>,
    {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialize(e.to_string()))
    }
}
