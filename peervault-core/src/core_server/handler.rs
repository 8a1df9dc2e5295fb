//! Store/Retrieve request handling
//!
//! One handler per worker, wrapping that worker's connection pool.
//!
//! Store acknowledges even when the underlying write fails: the failure
//! is logged and counted, never surfaced to the caller. Operators see
//! dropped writes only through the logs and counters.

use metrics::{counter, describe_counter};
use tracing::{error, info, warn};

use super::protocol::{RetrieveRequest, RetrieveResponse, StoreRequest, StoreResponse};
use crate::core_alloc::types::PeerId;
use crate::core_storage::errors::StorageError;
use crate::core_storage::pool::ConnectionPool;

/// Register descriptions for the request-path counters
pub fn describe_metrics() {
    describe_counter!("vault.store.total", "Total Store requests received");
    describe_counter!(
        "vault.store.failed",
        "Store requests whose write failed but were acked anyway"
    );
    describe_counter!("vault.store.rejected", "Store requests from unallocated peers");
    describe_counter!("vault.retrieve.total", "Total Retrieve requests received");
    describe_counter!("vault.retrieve.miss", "Retrieve requests answered NotFound");
}

/// Serves Store/Retrieve against one worker's pool and the directory
pub struct RequestHandler {
    pool: ConnectionPool,
}

impl RequestHandler {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Handle a Store request from `sender`
    pub fn store(&mut self, sender: &PeerId, request: &StoreRequest) -> StoreResponse {
        counter!("vault.store.total").increment(1);
        info!(peer = %sender, key = request.key, "STORE request");

        let handle = match self.pool.handle(sender) {
            Ok(handle) => handle,
            Err(StorageError::PeerNotAllocated(_)) => {
                counter!("vault.store.rejected").increment(1);
                warn!(peer = %sender, key = request.key, "STORE from unallocated peer rejected");
                return StoreResponse::NotAllocated;
            }
            Err(e) => {
                // Fire-and-forget past allocation: the ack goes out even
                // though nothing was written.
                counter!("vault.store.failed").increment(1);
                error!(peer = %sender, key = request.key, error = %e, "STORE could not open handle");
                return StoreResponse::Ack;
            }
        };

        match handle.write(request.key, request.data.as_deref()) {
            Ok(()) => info!(peer = %sender, key = request.key, "stored data"),
            Err(e) => {
                counter!("vault.store.failed").increment(1);
                error!(peer = %sender, key = request.key, error = %e, "STORE write failed");
            }
        }

        StoreResponse::Ack
    }

    /// Handle a Retrieve request from `sender`
    pub fn retrieve(&mut self, sender: &PeerId, request: &RetrieveRequest) -> RetrieveResponse {
        counter!("vault.retrieve.total").increment(1);
        info!(peer = %sender, key = request.key, "RETRIEVE request");

        let handle = match self.pool.handle(sender) {
            Ok(handle) => handle,
            Err(e) => {
                // Fail closed: unknown peers and unknown keys look alike.
                counter!("vault.retrieve.miss").increment(1);
                warn!(peer = %sender, key = request.key, error = %e, "RETRIEVE failed closed");
                return RetrieveResponse::NotFound;
            }
        };

        match handle.read(request.key) {
            Ok(Some(data)) => {
                info!(peer = %sender, key = request.key, "found data");
                RetrieveResponse::Found(data)
            }
            Ok(None) => {
                counter!("vault.retrieve.miss").increment(1);
                warn!(peer = %sender, key = request.key, "data not found");
                RetrieveResponse::NotFound
            }
            Err(e) => {
                counter!("vault.retrieve.miss").increment(1);
                error!(peer = %sender, key = request.key, error = %e, "RETRIEVE read failed");
                RetrieveResponse::NotFound
            }
        }
    }

    /// Close every handle this worker owns
    pub fn shutdown(&mut self) {
        self.pool.close_all();
    }
}
