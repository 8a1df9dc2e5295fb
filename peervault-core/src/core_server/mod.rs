//! Request serving
//!
//! `protocol` defines the Store/Retrieve message types the transport
//! exchanges, `handler` implements their semantics against one worker's
//! connection pool, and `dispatcher` fans requests out across the worker
//! pool behind a cloneable `StorageService`.

pub mod dispatcher;
pub mod handler;
pub mod protocol;

pub use dispatcher::{spawn_workers, ServiceError, StorageService, WorkerPool};
pub use handler::{describe_metrics, RequestHandler};
pub use protocol::{RetrieveRequest, RetrieveResponse, StoreRequest, StoreResponse};
