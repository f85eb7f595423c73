//! Unified error type for all store operations.

/// Things that can go wrong when using the store.
///
/// A missing key is not an error: lookups return `Ok(None)`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// File system problem (read, write, rename), including the backing file
    /// disappearing after the store was opened.
    Io(String),
    /// Failed to serialize the snapshot to bytes.
    Serialize(String),
    /// Failed to deserialize the backing file. Empty and truncated files end
    /// up here too.
    Deserialize(String),
    /// Bad configuration (zero reader slots, unusable lock name, etc.).
    Config(String),
    /// An OS synchronization object could not be opened, waited on or posted.
    Lock(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::Deserialize(msg) => write!(f, "deserialization error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Lock(msg) => write!(f, "lock error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
