//! Identity and allocation types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identity of a remote peer whose data this node stores.
///
/// Supplied by the transport layer alongside each request and trusted
/// as-is; the core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        PeerId(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        PeerId(s)
    }
}

/// Binds a peer to the file backing its table and the capacity it was
/// granted. Produced wholesale by a reallocation cycle and never mutated;
/// the next cycle supersedes it with a fresh descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// The peer this allocation belongs to
    pub peer: PeerId,
    /// Path of the SQLite file holding the peer's table
    pub path: PathBuf,
    /// Bytes of capacity granted to the peer
    pub capacity_bytes: u64,
}
