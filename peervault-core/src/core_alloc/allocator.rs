//! Allocation policy contract and the default partition policy

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use super::types::{PeerId, StorageDescriptor};
use crate::core_storage::engine::db_file_name;

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("failed to prepare storage root: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract the storage core requires from the allocation policy.
///
/// For an unchanged `(peers, threshold)` pair the result must be
/// identical call over call: same peers map to the same paths, and no
/// two peers ever share a path.
pub trait Allocator: Send + Sync {
    fn allocate(
        &self,
        peers: &[PeerId],
        threshold: f64,
    ) -> Result<Vec<StorageDescriptor>, AllocError>;
}

/// Default policy: split a fixed byte budget evenly across the peer set,
/// scaled by the fill threshold. Paths are derived from
/// (local identity, peer identity), so they are stable across cycles.
pub struct PartitionAllocator {
    local_id: PeerId,
    root: PathBuf,
    budget_bytes: u64,
}

impl PartitionAllocator {
    pub fn new(local_id: PeerId, root: impl Into<PathBuf>, budget_bytes: u64) -> Self {
        Self {
            local_id,
            root: root.into(),
            budget_bytes,
        }
    }
}

impl Allocator for PartitionAllocator {
    fn allocate(
        &self,
        peers: &[PeerId],
        threshold: f64,
    ) -> Result<Vec<StorageDescriptor>, AllocError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(AllocError::InvalidThreshold(threshold));
        }

        if peers.is_empty() {
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(&self.root)?;

        let per_peer = (self.budget_bytes as f64 * threshold / peers.len() as f64) as u64;

        let descriptors = peers
            .iter()
            .map(|peer| {
                let path = self.root.join(db_file_name(&self.local_id, peer));
                debug!(peer = %peer, path = %path.display(), capacity = per_peer, "allocated");
                StorageDescriptor {
                    peer: peer.clone(),
                    path,
                    capacity_bytes: per_peer,
                }
            })
            .collect();

        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn allocator(root: &std::path::Path) -> PartitionAllocator {
        PartitionAllocator::new(PeerId::from("local-node"), root, 1_000_000)
    }

    #[test]
    fn test_allocate_splits_budget_evenly() {
        let dir = tempfile::tempdir().unwrap();
        let peers = vec![PeerId::from("peer-a"), PeerId::from("peer-b")];

        let descriptors = allocator(dir.path()).allocate(&peers, 0.5).unwrap();

        assert_eq!(descriptors.len(), 2);
        for desc in &descriptors {
            assert_eq!(desc.capacity_bytes, 250_000);
        }
    }

    #[test]
    fn test_allocate_paths_are_distinct_and_stable() {
        let dir = tempfile::tempdir().unwrap();
        let peers = vec![
            PeerId::from("peer-a"),
            PeerId::from("peer-b"),
            PeerId::from("peer-c"),
        ];
        let allocator = allocator(dir.path());

        let first = allocator.allocate(&peers, 0.5).unwrap();
        let second = allocator.allocate(&peers, 0.5).unwrap();

        assert_eq!(first, second);

        let paths: HashSet<_> = first.iter().map(|d| d.path.clone()).collect();
        assert_eq!(paths.len(), peers.len());
    }

    #[test]
    fn test_allocate_rejects_invalid_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let peers = vec![PeerId::from("peer-a")];
        let allocator = allocator(dir.path());

        assert!(matches!(
            allocator.allocate(&peers, 0.0),
            Err(AllocError::InvalidThreshold(_))
        ));
        assert!(matches!(
            allocator.allocate(&peers, 1.1),
            Err(AllocError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_allocate_empty_peer_set() {
        let dir = tempfile::tempdir().unwrap();
        let descriptors = allocator(dir.path()).allocate(&[], 0.5).unwrap();
        assert!(descriptors.is_empty());
    }
}
