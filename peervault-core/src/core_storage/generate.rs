//! Table provisioning
//!
//! Brings each peer's table up to its allocated capacity by inserting
//! placeholder rows the request path later overwrites in place. Safe to
//! invoke repeatedly: an already-provisioned table is left untouched
//! unless `restart` asks for a destructive rebuild.

use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::engine::table_name;
use super::errors::{StorageError, StorageResult};
use crate::core_alloc::types::{PeerId, StorageDescriptor};

/// Bytes of placeholder data held by each provisioned row
pub const CHUNK_BYTES: usize = 512;

/// Provision a single peer's table to its allocated capacity.
///
/// Returns the number of rows inserted (0 when the table already meets
/// its target and `restart` is false).
pub fn provision_one(
    local: &PeerId,
    descriptor: &StorageDescriptor,
    restart: bool,
) -> StorageResult<u64> {
    if let Some(parent) = descriptor.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(&descriptor.path)?;
    let table = table_name(local, &descriptor.peer);

    if restart {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table))?;
    }

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, data TEXT)",
        table
    ))?;

    let target = descriptor.capacity_bytes / CHUNK_BYTES as u64;
    let existing: u64 =
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get::<_, i64>(0).map(|n| n.max(0) as u64)
        })?;

    if existing >= target {
        debug!(peer = %descriptor.peer, rows = existing, "table already provisioned");
        return Ok(0);
    }

    let filler = "0".repeat(CHUNK_BYTES);
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT OR IGNORE INTO {} (id, data) VALUES (?, ?)",
            table
        ))?;
        for id in existing..target {
            stmt.execute(params![id as i64, filler])?;
        }
    }
    tx.commit()?;

    let added = target - existing;
    debug!(peer = %descriptor.peer, rows = added, "provisioned placeholder rows");
    Ok(added)
}

/// Provision every descriptor, at most `workers` tables at a time.
///
/// `restart = true` destructively rebuilds each table and is only meant
/// for explicit operator opt-in at startup.
pub async fn generate(
    local: &PeerId,
    descriptors: Vec<StorageDescriptor>,
    restart: bool,
    workers: usize,
) -> StorageResult<()> {
    let tables = descriptors.len();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = Vec::with_capacity(tables);

    for descriptor in descriptors {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StorageError::Provision(e.to_string()))?;
        let local = local.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            provision_one(&local, &descriptor, restart)
        }));
    }

    let mut rows_added = 0;
    for task in tasks {
        rows_added += task
            .await
            .map_err(|e| StorageError::Provision(e.to_string()))??;
    }

    info!(tables, rows_added, restart, "provisioning complete");
    Ok(())
}
