//! Node supervisor - the timer-driven main loop
//!
//! Owns the control cadence: telemetry logging every few steps,
//! reallocation every `steps_per_reallocate` steps, and a per-tick fault
//! wall so a failed cycle never takes the loop down. The loop exits only
//! on the shutdown signal, at which point the request workers are
//! drained and their handles closed.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::membership::Membership;
use super::scheduler::{ReallocError, ReallocationScheduler};
use crate::config::Config;
use crate::core_alloc::allocator::Allocator;
use crate::core_alloc::directory::AllocationDirectory;
use crate::core_alloc::types::PeerId;
use crate::core_server::dispatcher::{spawn_workers, StorageService, WorkerPool};
use crate::shutdown::ShutdownCoordinator;

/// Steps between best-effort telemetry log lines
const TELEMETRY_EVERY_STEPS: u64 = 5;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Realloc(#[from] ReallocError),
}

/// A running storage node: provisioned tables, live workers, main loop
pub struct Node {
    tick_interval: Duration,
    steps_per_reallocate: u64,
    membership: Arc<dyn Membership>,
    scheduler: ReallocationScheduler,
    service: StorageService,
    workers: WorkerPool,
    shutdown: Arc<ShutdownCoordinator>,
}

impl Node {
    /// Provision storage per `config` and spawn the request workers.
    ///
    /// This is the only point where the destructive restart flag is
    /// honored; every later reallocation runs non-destructively.
    pub async fn start(
        config: &Config,
        membership: Arc<dyn Membership>,
        allocator: Arc<dyn Allocator>,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Result<Self, NodeError> {
        let local_id = PeerId::from(config.node.local_id.clone());
        let directory = Arc::new(AllocationDirectory::new());

        let scheduler = ReallocationScheduler::new(
            local_id.clone(),
            config.allocation.threshold,
            config.storage.generate_workers,
            membership.clone(),
            allocator,
            directory.clone(),
        );

        let installed = scheduler.reallocate(config.allocation.restart).await?;
        info!(peers = installed, "initial allocation installed");

        let (service, workers) = spawn_workers(
            config.storage.request_workers,
            local_id,
            directory,
            &shutdown,
        );

        Ok(Self {
            tick_interval: config.node.tick_interval,
            steps_per_reallocate: config.node.steps_per_reallocate,
            membership,
            scheduler,
            service,
            workers,
            shutdown,
        })
    }

    /// Handle the transport uses to submit Store/Retrieve requests
    pub fn service(&self) -> StorageService {
        self.service.clone()
    }

    /// Run the main loop until the shutdown signal arrives.
    ///
    /// Every tick body is fault-isolated: a failed step is logged and
    /// the next tick proceeds as if nothing happened.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; consume that so step 1 lands one
        // full tick after startup.
        interval.tick().await;

        let mut step: u64 = 0;
        info!("main loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    step += 1;
                    if let Err(e) = self.step(step).await {
                        error!(step, error = %e, "tick failed; continuing");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.stop().await;
    }

    async fn step(&self, step: u64) -> Result<(), NodeError> {
        if step % TELEMETRY_EVERY_STEPS == 0 {
            match self.membership.telemetry().await {
                Ok(t) => info!(
                    step,
                    block = t.block,
                    stake = t.stake,
                    rank = t.rank,
                    trust = t.trust,
                    consensus = t.consensus,
                    incentive = t.incentive,
                    emission = t.emission,
                    "network telemetry"
                ),
                Err(e) => debug!(step, error = %e, "telemetry unavailable"),
            }
        }

        if step % self.steps_per_reallocate == 0 {
            self.scheduler.reallocate(false).await?;
        }

        Ok(())
    }

    async fn stop(self) {
        // Dropping our sender half stops new requests from this side;
        // workers also see the shutdown broadcast and drain out.
        drop(self.service);
        self.workers.join().await;
        info!("node stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core_alloc::allocator::PartitionAllocator;
    use crate::core_node::membership::StaticMembership;
    use crate::core_server::protocol::{RetrieveRequest, RetrieveResponse, StoreRequest, StoreResponse};
    use crate::core_storage::generate::CHUNK_BYTES;

    fn test_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.node.local_id = "local-node".to_string();
        config.node.tick_interval = Duration::from_millis(10);
        config.node.steps_per_reallocate = 2;
        config.storage.data_root = dir.to_path_buf();
        config.storage.request_workers = 2;
        config.allocation.budget_bytes = 64 * CHUNK_BYTES as u64;
        config.allocation.threshold = 0.5;
        config
    }

    #[tokio::test]
    async fn test_node_serves_requests_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let membership = Arc::new(StaticMembership::new(vec![PeerId::from("peer-a")]));
        let allocator = Arc::new(PartitionAllocator::new(
            PeerId::from("local-node"),
            dir.path(),
            config.allocation.budget_bytes,
        ));
        let shutdown = Arc::new(ShutdownCoordinator::new());

        let node = Node::start(&config, membership, allocator, shutdown.clone())
            .await
            .unwrap();
        let service = node.service();
        let running = tokio::spawn(node.run());

        let ack = service
            .store(
                PeerId::from("peer-a"),
                StoreRequest {
                    key: 0,
                    data: Some("v0".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(ack, StoreResponse::Ack);

        let response = service
            .retrieve(PeerId::from("peer-a"), RetrieveRequest { key: 0 })
            .await
            .unwrap();
        assert_eq!(response, RetrieveResponse::Found("v0".to_string()));

        shutdown.shutdown();
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_node_reallocates_on_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let membership = Arc::new(StaticMembership::new(vec![PeerId::from("peer-a")]));
        let allocator = Arc::new(PartitionAllocator::new(
            PeerId::from("local-node"),
            dir.path(),
            config.allocation.budget_bytes,
        ));
        let shutdown = Arc::new(ShutdownCoordinator::new());

        let node = Node::start(&config, membership.clone(), allocator, shutdown.clone())
            .await
            .unwrap();
        let service = node.service();
        let running = tokio::spawn(node.run());

        // peer-b joins after startup; the next reallocation cycle
        // (every 2 ticks of 10ms) must start serving it.
        membership.set_peers(vec![PeerId::from("peer-a"), PeerId::from("peer-b")]);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let ack = service
            .store(
                PeerId::from("peer-b"),
                StoreRequest {
                    key: 0,
                    data: Some("late".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(ack, StoreResponse::Ack);

        shutdown.shutdown();
        running.await.unwrap();
    }
}
