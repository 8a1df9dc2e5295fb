//! Storage engine - one SQLite table per peer
//!
//! Table and file names are derived from the (local identity, peer
//! identity) pair by hashing, so any opaque identity string maps to a
//! valid SQL identifier and distinct pairs never collide.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::errors::{StorageError, StorageResult};
use crate::core_alloc::types::{PeerId, StorageDescriptor};

/// Stable hex tag for a (local, peer) pair
fn pair_tag(local: &PeerId, peer: &PeerId) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(local.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(peer.as_str().as_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}

/// Name of the table holding `peer`'s records on this node
pub fn table_name(local: &PeerId, peer: &PeerId) -> String {
    format!("peer_store_{}", pair_tag(local, peer))
}

/// File name of the SQLite database backing `peer`'s table
pub fn db_file_name(local: &PeerId, peer: &PeerId) -> String {
    format!("store-{}.db", pair_tag(local, peer))
}

/// An open connection to one peer's table.
///
/// Owned by exactly one worker; the underlying connection must never be
/// used from two threads at once.
pub struct StorageHandle {
    peer: PeerId,
    table: String,
    conn: Connection,
}

impl std::fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandle")
            .field("peer", &self.peer)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl StorageHandle {
    /// Open a handle to the table described by `descriptor`
    pub fn open(local: &PeerId, descriptor: &StorageDescriptor) -> StorageResult<Self> {
        let conn = Connection::open(&descriptor.path)?;
        Ok(Self {
            peer: descriptor.peer.clone(),
            table: table_name(local, &descriptor.peer),
            conn,
        })
    }

    /// Overwrite the row matching `key`, committing before returning.
    ///
    /// A zero-row update means the key was never provisioned and is
    /// reported as an error; rows are only ever created by provisioning.
    pub fn write(&self, key: i64, data: Option<&str>) -> StorageResult<()> {
        let sql = format!("UPDATE {} SET data = ? WHERE id = ?", self.table);
        let affected = self.conn.execute(&sql, params![data, key])?;
        if affected == 0 {
            return Err(StorageError::RowNotProvisioned(key));
        }
        Ok(())
    }

    /// Read the row matching `key`.
    ///
    /// An absent row and a row holding NULL are both `None`; readers
    /// cannot tell the two apart.
    pub fn read(&self, key: i64) -> StorageResult<Option<String>> {
        let sql = format!("SELECT data FROM {} WHERE id = ?", self.table);
        let row: Option<Option<String>> = self
            .conn
            .query_row(&sql, params![key], |row| row.get(0))
            .optional()?;
        Ok(row.flatten())
    }

    /// Close the handle, reporting any flush failure
    pub fn close(self) -> StorageResult<()> {
        debug!(peer = %self.peer, "closing table handle");
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_storage::generate::provision_one;
    use std::path::PathBuf;

    fn local() -> PeerId {
        PeerId::from("local-node")
    }

    fn provisioned_handle(dir: &std::path::Path, peer: &str, capacity: u64) -> StorageHandle {
        let peer = PeerId::from(peer);
        let descriptor = StorageDescriptor {
            peer: peer.clone(),
            path: dir.join(db_file_name(&local(), &peer)),
            capacity_bytes: capacity,
        };
        provision_one(&local(), &descriptor, false).unwrap();
        StorageHandle::open(&local(), &descriptor).unwrap()
    }

    #[test]
    fn test_table_name_is_deterministic() {
        let a = PeerId::from("peer-a");
        assert_eq!(table_name(&local(), &a), table_name(&local(), &a));
    }

    #[test]
    fn test_table_name_distinct_per_pair() {
        let a = PeerId::from("peer-a");
        let b = PeerId::from("peer-b");
        let other_local = PeerId::from("other-node");

        assert_ne!(table_name(&local(), &a), table_name(&local(), &b));
        assert_ne!(table_name(&local(), &a), table_name(&other_local, &a));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let handle = provisioned_handle(dir.path(), "peer-a", 4096);

        handle.write(0, Some("hello")).unwrap();
        assert_eq!(handle.read(0).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_write_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let handle = provisioned_handle(dir.path(), "peer-a", 4096);

        handle.write(1, Some("first")).unwrap();
        handle.write(1, Some("second")).unwrap();
        assert_eq!(handle.read(1).unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_null_data_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let handle = provisioned_handle(dir.path(), "peer-a", 4096);

        handle.write(0, None).unwrap();
        assert_eq!(handle.read(0).unwrap(), None);
    }

    #[test]
    fn test_read_of_unprovisioned_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let handle = provisioned_handle(dir.path(), "peer-a", 4096);

        assert_eq!(handle.read(999_999).unwrap(), None);
    }

    #[test]
    fn test_write_to_unprovisioned_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handle = provisioned_handle(dir.path(), "peer-a", 4096);

        let err = handle.write(999_999, Some("lost")).unwrap_err();
        assert!(matches!(err, StorageError::RowNotProvisioned(999_999)));
    }

    #[test]
    fn test_open_missing_parent_fails() {
        let peer = PeerId::from("peer-a");
        let descriptor = StorageDescriptor {
            peer: peer.clone(),
            path: PathBuf::from("/nonexistent-root/deeply/store.db"),
            capacity_bytes: 4096,
        };
        assert!(StorageHandle::open(&local(), &descriptor).is_err());
    }
}
