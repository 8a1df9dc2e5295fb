//! Network membership collaborator
//!
//! The storage core never discovers peers itself; it consumes a
//! membership service that knows the current peer set and, best-effort,
//! the node's standing in the network for health logging.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

use crate::core_alloc::types::PeerId;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("membership unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort health snapshot logged by the main loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTelemetry {
    pub block: u64,
    pub stake: f64,
    pub rank: f64,
    pub trust: f64,
    pub consensus: f64,
    pub incentive: f64,
    pub emission: f64,
}

/// Read-only view of the network this node stores data for
#[async_trait]
pub trait Membership: Send + Sync {
    /// Current set of peers whose data this node is expected to hold
    async fn peers(&self) -> Result<Vec<PeerId>, MembershipError>;

    /// Telemetry snapshot for health logging; failures are non-critical
    async fn telemetry(&self) -> Result<NetworkTelemetry, MembershipError>;
}

/// Fixed peer set, for tests and single-node deployments
pub struct StaticMembership {
    peers: RwLock<Vec<PeerId>>,
    telemetry: NetworkTelemetry,
}

impl StaticMembership {
    pub fn new(peers: Vec<PeerId>) -> Self {
        Self {
            peers: RwLock::new(peers),
            telemetry: NetworkTelemetry::default(),
        }
    }

    /// Replace the peer set; the next reallocation cycle picks it up
    pub fn set_peers(&self, peers: Vec<PeerId>) {
        *self.peers.write().unwrap_or_else(|e| e.into_inner()) = peers;
    }
}

#[async_trait]
impl Membership for StaticMembership {
    async fn peers(&self) -> Result<Vec<PeerId>, MembershipError> {
        Ok(self
            .peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn telemetry(&self) -> Result<NetworkTelemetry, MembershipError> {
        Ok(self.telemetry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_membership_returns_configured_peers() {
        let membership = StaticMembership::new(vec![PeerId::from("peer-a")]);
        let peers = membership.peers().await.unwrap();
        assert_eq!(peers, vec![PeerId::from("peer-a")]);
    }

    #[tokio::test]
    async fn test_static_membership_peer_set_can_change() {
        let membership = StaticMembership::new(vec![PeerId::from("peer-a")]);
        membership.set_peers(vec![PeerId::from("peer-b"), PeerId::from("peer-c")]);

        let peers = membership.peers().await.unwrap();
        assert_eq!(peers.len(), 2);
        assert!(!peers.contains(&PeerId::from("peer-a")));
    }

    #[tokio::test]
    async fn test_static_membership_telemetry_is_default() {
        let membership = StaticMembership::new(Vec::new());
        assert_eq!(
            membership.telemetry().await.unwrap(),
            NetworkTelemetry::default()
        );
    }
}
