//! Worker pool and service front door
//!
//! Each worker task owns its own `RequestHandler` (and so its own table
//! handles); the transport only ever sees the cloneable
//! `StorageService`, which round-robins jobs across workers and carries
//! replies back over oneshot channels. Workers stop on the shutdown
//! broadcast or when every service clone is gone, closing their handles
//! on the way out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::handler::RequestHandler;
use super::protocol::{RetrieveRequest, RetrieveResponse, StoreRequest, StoreResponse};
use crate::core_alloc::directory::AllocationDirectory;
use crate::core_alloc::types::PeerId;
use crate::core_storage::pool::ConnectionPool;
use crate::shutdown::ShutdownCoordinator;

const JOB_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The worker pool is shutting down; no new requests are accepted
    #[error("storage workers unavailable")]
    Unavailable,
}

enum Job {
    Store {
        sender: PeerId,
        request: StoreRequest,
        reply: oneshot::Sender<StoreResponse>,
    },
    Retrieve {
        sender: PeerId,
        request: RetrieveRequest,
        reply: oneshot::Sender<RetrieveResponse>,
    },
}

/// Cloneable handle the transport submits requests through
#[derive(Clone)]
pub struct StorageService {
    workers: Arc<Vec<mpsc::Sender<Job>>>,
    next: Arc<AtomicUsize>,
}

impl StorageService {
    /// Submit a Store request on behalf of `sender`
    pub async fn store(
        &self,
        sender: PeerId,
        request: StoreRequest,
    ) -> Result<StoreResponse, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(Job::Store {
            sender,
            request,
            reply,
        })
        .await?;
        response.await.map_err(|_| ServiceError::Unavailable)
    }

    /// Submit a Retrieve request on behalf of `sender`
    pub async fn retrieve(
        &self,
        sender: PeerId,
        request: RetrieveRequest,
    ) -> Result<RetrieveResponse, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(Job::Retrieve {
            sender,
            request,
            reply,
        })
        .await?;
        response.await.map_err(|_| ServiceError::Unavailable)
    }

    async fn dispatch(&self, job: Job) -> Result<(), ServiceError> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[index]
            .send(job)
            .await
            .map_err(|_| ServiceError::Unavailable)
    }
}

/// Join handle over the spawned worker tasks
pub struct WorkerPool {
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Await every worker; each closes its handles before exiting
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "storage worker panicked");
            }
        }
    }
}

/// Spawn `count` workers, each owning one connection pool
pub fn spawn_workers(
    count: usize,
    local_id: PeerId,
    directory: Arc<AllocationDirectory>,
    shutdown: &ShutdownCoordinator,
) -> (StorageService, WorkerPool) {
    let count = count.max(1);
    let mut senders = Vec::with_capacity(count);
    let mut tasks = Vec::with_capacity(count);

    for worker in 0..count {
        let (tx, rx) = mpsc::channel(JOB_QUEUE_DEPTH);
        let handler = RequestHandler::new(ConnectionPool::new(
            local_id.clone(),
            directory.clone(),
        ));
        tasks.push(tokio::spawn(worker_loop(
            worker,
            handler,
            rx,
            shutdown.subscribe(),
        )));
        senders.push(tx);
    }

    let service = StorageService {
        workers: Arc::new(senders),
        next: Arc::new(AtomicUsize::new(0)),
    };

    (service, WorkerPool { tasks })
}

async fn worker_loop(
    worker: usize,
    mut handler: RequestHandler,
    mut jobs: mpsc::Receiver<Job>,
    mut shutdown: broadcast::Receiver<()>,
) {
    debug!(worker, "storage worker started");

    loop {
        tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => serve(&mut handler, job),
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }

    handler.shutdown();
    debug!(worker, "storage worker stopped");
}

fn serve(handler: &mut RequestHandler, job: Job) {
    match job {
        Job::Store {
            sender,
            request,
            reply,
        } => {
            // The caller may have gone away; the write already happened.
            let _ = reply.send(handler.store(&sender, &request));
        }
        Job::Retrieve {
            sender,
            request,
            reply,
        } => {
            let _ = reply.send(handler.retrieve(&sender, &request));
        }
    }
}
