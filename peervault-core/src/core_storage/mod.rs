//! Embedded per-peer storage
//!
//! Each peer the node serves gets its own SQLite file holding a single
//! `{id, data}` table. `engine` owns naming and row access, `generate`
//! provisions tables to their allocated capacity, and `pool` caches open
//! handles per worker.

pub mod engine;
pub mod errors;
pub mod generate;
pub mod pool;

pub use engine::{db_file_name, table_name, StorageHandle};
pub use errors::{StorageError, StorageResult};
pub use generate::{generate, CHUNK_BYTES};
pub use pool::ConnectionPool;
