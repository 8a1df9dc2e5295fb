//! Node orchestration
//!
//! `membership` is the read-only view of the network the node serves,
//! `scheduler` re-derives the allocation directory from it, and `node`
//! is the timer-driven supervisor that keeps both running through
//! transient faults.

pub mod membership;
pub mod node;
pub mod scheduler;

pub use membership::{Membership, MembershipError, NetworkTelemetry, StaticMembership};
pub use node::{Node, NodeError};
pub use scheduler::{ReallocError, ReallocationScheduler};
