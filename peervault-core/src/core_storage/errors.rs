//! Error types for the storage engine

use crate::core_alloc::types::PeerId;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Peer absent from the current allocation directory snapshot
    #[error("peer not allocated: {0}")]
    PeerNotAllocated(PeerId),

    /// Underlying SQLite failure (lock contention, I/O, corrupt file)
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure while preparing storage
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Update matched no row; the key was never provisioned
    #[error("no provisioned row for key {0}")]
    RowNotProvisioned(i64),

    /// Provisioning task failed to run to completion
    #[error("provisioning failed: {0}")]
    Provision(String),
}
