//! Allocation directory - the peer to storage-descriptor mapping
//!
//! Single writer (the reallocation cycle), many readers (request
//! handlers). The mapping lives in an immutable `Arc<HashMap>` snapshot;
//! `replace` swaps the whole snapshot under a briefly-held lock, so a
//! reader always observes a fully-consistent version and requests already
//! holding a snapshot keep using it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use super::types::{PeerId, StorageDescriptor};

type Snapshot = Arc<HashMap<PeerId, StorageDescriptor>>;

/// Immutable-snapshot mapping from peer identity to storage descriptor
pub struct AllocationDirectory {
    // The lock guards only the pointer swap; a poisoned lock still holds
    // a fully-built snapshot, so reads recover instead of failing.
    snapshot: RwLock<Snapshot>,
}

impl AllocationDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Look up the current descriptor for a peer
    pub fn lookup(&self, peer: &PeerId) -> Option<StorageDescriptor> {
        self.current().get(peer).cloned()
    }

    /// The current snapshot; callers keep it valid for as long as needed
    pub fn current(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install a new snapshot built from `descriptors`, replacing the old
    /// one as a whole unit. Returns the number of peers installed.
    ///
    /// At most one descriptor per peer: a later duplicate wins.
    pub fn replace(&self, descriptors: Vec<StorageDescriptor>) -> usize {
        let next: HashMap<PeerId, StorageDescriptor> = descriptors
            .into_iter()
            .map(|d| (d.peer.clone(), d))
            .collect();
        let installed = next.len();

        let mut snapshot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *snapshot = Arc::new(next);
        drop(snapshot);

        info!(peers = installed, "allocation directory replaced");
        installed
    }

    /// Number of peers in the current snapshot
    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }
}

impl Default for AllocationDirectory {
    fn default() -> Self {
        Self::new()
    }
}
