//! Per-worker connection pool
//!
//! Each request worker owns one `ConnectionPool`; handles opened through
//! it are cached for the worker's lifetime and are never handed to
//! another worker. Isolation is per-(worker, peer), not global.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::engine::StorageHandle;
use super::errors::{StorageError, StorageResult};
use crate::core_alloc::directory::AllocationDirectory;
use crate::core_alloc::types::PeerId;

/// Lazily-populated cache of open table handles, keyed by peer identity
pub struct ConnectionPool {
    local_id: PeerId,
    directory: Arc<AllocationDirectory>,
    handles: HashMap<PeerId, StorageHandle>,
}

impl ConnectionPool {
    pub fn new(local_id: PeerId, directory: Arc<AllocationDirectory>) -> Self {
        Self {
            local_id,
            directory,
            handles: HashMap::new(),
        }
    }

    /// Get this worker's handle for `peer`, opening one on first use.
    ///
    /// Fails with `PeerNotAllocated` when the peer is absent from the
    /// current directory snapshot. A handle opened against a descriptor
    /// that a later reallocation superseded stays cached and usable until
    /// the worker shuts down.
    pub fn handle(&mut self, peer: &PeerId) -> StorageResult<&StorageHandle> {
        match self.handles.entry(peer.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let descriptor = self
                    .directory
                    .lookup(peer)
                    .ok_or_else(|| StorageError::PeerNotAllocated(peer.clone()))?;
                info!(peer = %peer, path = %descriptor.path.display(), "opening table handle");
                Ok(entry.insert(StorageHandle::open(&self.local_id, &descriptor)?))
            }
        }
    }

    /// Number of handles this worker currently holds
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Close every handle this worker owns; invoked on worker shutdown
    pub fn close_all(&mut self) {
        for (peer, handle) in self.handles.drain() {
            match handle.close() {
                Ok(()) => info!(peer = %peer, "closed table handle"),
                Err(e) => warn!(peer = %peer, error = %e, "failed to close table handle"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_alloc::types::StorageDescriptor;
    use crate::core_storage::engine::db_file_name;
    use crate::core_storage::generate::{provision_one, CHUNK_BYTES};

    fn local() -> PeerId {
        PeerId::from("local-node")
    }

    fn provisioned_directory(dir: &std::path::Path, peers: &[&str]) -> Arc<AllocationDirectory> {
        let descriptors: Vec<StorageDescriptor> = peers
            .iter()
            .map(|peer| {
                let peer = PeerId::from(*peer);
                StorageDescriptor {
                    path: dir.join(db_file_name(&local(), &peer)),
                    peer,
                    capacity_bytes: 4 * CHUNK_BYTES as u64,
                }
            })
            .collect();

        for descriptor in &descriptors {
            provision_one(&local(), descriptor, false).unwrap();
        }

        let directory = AllocationDirectory::new();
        directory.replace(descriptors);
        Arc::new(directory)
    }

    #[test]
    fn test_handle_for_unallocated_peer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let directory = provisioned_directory(dir.path(), &[]);
        let mut pool = ConnectionPool::new(local(), directory);

        let err = pool.handle(&PeerId::from("stranger")).unwrap_err();
        assert!(matches!(err, StorageError::PeerNotAllocated(_)));
        assert_eq!(pool.open_handles(), 0);
    }

    #[test]
    fn test_handle_is_cached_per_peer() {
        let dir = tempfile::tempdir().unwrap();
        let directory = provisioned_directory(dir.path(), &["peer-a"]);
        let mut pool = ConnectionPool::new(local(), directory);
        let peer = PeerId::from("peer-a");

        pool.handle(&peer).unwrap();
        assert_eq!(pool.open_handles(), 1);

        // Second call reuses the cached handle instead of opening again.
        pool.handle(&peer).unwrap();
        assert_eq!(pool.open_handles(), 1);
    }

    #[test]
    fn test_cached_handle_survives_reallocation() {
        let dir = tempfile::tempdir().unwrap();
        let directory = provisioned_directory(dir.path(), &["peer-a"]);
        let mut pool = ConnectionPool::new(local(), directory.clone());
        let peer = PeerId::from("peer-a");

        pool.handle(&peer).unwrap().write(0, Some("v")).unwrap();

        // Peer disappears from the directory; the cached handle stays
        // usable until this worker is recycled.
        directory.replace(Vec::new());
        assert_eq!(
            pool.handle(&peer).unwrap().read(0).unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn test_close_all_drops_every_handle() {
        let dir = tempfile::tempdir().unwrap();
        let directory = provisioned_directory(dir.path(), &["peer-a", "peer-b"]);
        let mut pool = ConnectionPool::new(local(), directory);

        pool.handle(&PeerId::from("peer-a")).unwrap();
        pool.handle(&PeerId::from("peer-b")).unwrap();
        assert_eq!(pool.open_handles(), 2);

        pool.close_all();
        assert_eq!(pool.open_handles(), 0);
    }
}
