//! Capacity allocation - who gets how much storage, and where
//!
//! `core_alloc` owns the peer-to-storage mapping: identity types, the
//! atomically-swapped `AllocationDirectory` consulted on every request,
//! and the `Allocator` contract the allocation policy must satisfy.

pub mod allocator;
pub mod directory;
pub mod types;

pub use allocator::{AllocError, Allocator, PartitionAllocator};
pub use directory::AllocationDirectory;
pub use types::{PeerId, StorageDescriptor};
