//! Reallocation scheduler
//!
//! One cycle re-derives who gets how much storage: snapshot the peer
//! set, ask the allocation policy for descriptors, provision any new or
//! grown tables, then swap the directory. Handles already cached by
//! workers are left alone; only future lookups see the new snapshot.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::membership::{Membership, MembershipError};
use crate::core_alloc::allocator::{AllocError, Allocator};
use crate::core_alloc::directory::AllocationDirectory;
use crate::core_alloc::types::PeerId;
use crate::core_storage::errors::StorageError;
use crate::core_storage::generate::generate;

#[derive(Debug, Error)]
pub enum ReallocError {
    #[error("membership error: {0}")]
    Membership(#[from] MembershipError),

    #[error("allocation error: {0}")]
    Alloc(#[from] AllocError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Recomputes the allocation directory on demand
pub struct ReallocationScheduler {
    local_id: PeerId,
    threshold: f64,
    generate_workers: usize,
    membership: Arc<dyn Membership>,
    allocator: Arc<dyn Allocator>,
    directory: Arc<AllocationDirectory>,
}

impl ReallocationScheduler {
    pub fn new(
        local_id: PeerId,
        threshold: f64,
        generate_workers: usize,
        membership: Arc<dyn Membership>,
        allocator: Arc<dyn Allocator>,
        directory: Arc<AllocationDirectory>,
    ) -> Self {
        Self {
            local_id,
            threshold,
            generate_workers,
            membership,
            allocator,
            directory,
        }
    }

    /// Run one reallocation cycle; returns the installed peer count.
    ///
    /// `restart` destructively rebuilds every table and is honored only
    /// at process startup; steady-state callers must pass `false`.
    pub async fn reallocate(&self, restart: bool) -> Result<usize, ReallocError> {
        let peers = self.membership.peers().await?;
        debug!(peers = peers.len(), restart, "reallocation cycle started");

        let descriptors = self.allocator.allocate(&peers, self.threshold)?;
        generate(
            &self.local_id,
            descriptors.clone(),
            restart,
            self.generate_workers,
        )
        .await?;

        let installed = self.directory.replace(descriptors);
        info!(peers = installed, "reallocation cycle complete");
        Ok(installed)
    }
}
