//! PeerVault core - per-peer isolated storage serving
//!
//! A PeerVault node keeps one SQLite table per remote peer, sized by a
//! periodically re-derived allocation, and serves Store/Retrieve
//! requests against those tables through a pool of workers that each own
//! their connections exclusively.

pub mod config;
pub mod core_alloc;
pub mod core_node;
pub mod core_server;
pub mod core_storage;
pub mod logging;
pub mod shutdown;

pub use config::Config;
pub use logging::{init_logging, LogLevel};
