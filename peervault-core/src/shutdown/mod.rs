//! Graceful shutdown coordinator
//!
//! A single coordinator is shared between the main loop and the request
//! workers. Anyone may trigger shutdown; everyone observes it through a
//! broadcast subscription.

use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{error, info};

/// Lifecycle state of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
}

/// Graceful shutdown coordinator
pub struct ShutdownCoordinator {
    state: RwLock<ShutdownState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Create a new coordinator in the `Running` state
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            state: RwLock::new(ShutdownState::Running),
            shutdown_tx,
        }
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiate shutdown; idempotent
    pub fn shutdown(&self) {
        // The state lock only ever guards this enum; recover from poison.
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state == ShutdownState::ShuttingDown {
            return;
        }
        *state = ShutdownState::ShuttingDown;
        drop(state);

        info!("initiating graceful shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            error!("failed to broadcast shutdown signal: {}", e);
        }
    }

    /// Check whether shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        *self.state.read().unwrap_or_else(|e| e.into_inner()) == ShutdownState::ShuttingDown
    }

    /// Current lifecycle state
    pub fn state(&self) -> ShutdownState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Install signal handlers that trigger graceful shutdown
#[cfg(unix)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                coordinator.shutdown();
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                coordinator.shutdown();
            }
        }
    });
}

/// Install signal handlers that trigger graceful shutdown (Windows)
#[cfg(windows)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("received Ctrl+C");
        coordinator.shutdown();
    });
}
