//! Catalog ledger
//!
//! The durable record set behind the catalog: one `CatalogEntry` per
//! published artifact, keyed by a store-assigned id. Backed by sled, whose
//! log-structured engine never rewrites records in place; every mutation is
//! flushed to stable storage before the call returns, so a crash immediately
//! after a successful `create` or `delete` cannot lose or truncate the
//! ledger.
//!
//! Keys are big-endian `u64` ids from sled's monotonic id generator: ids are
//! never reused (including across restarts and after deletions) and key
//! order equals insertion order, which is the order `list` serves.

use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One published artifact in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Store-assigned id, unique for the lifetime of the ledger
    pub id: u64,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    /// Storage name of the binary blob
    pub artifact_ref: String,
    /// Filename the artifact was uploaded under
    pub artifact_filename: String,
    /// Artifact size in bytes
    pub artifact_size: u64,
    /// SHA256 checksum recorded when the artifact blob was written
    pub artifact_checksum: String,
    /// Storage name of the optional preview image blob
    pub image_ref: Option<String>,
    /// Filename the image was uploaded under
    pub image_filename: Option<String>,
    /// Image size in bytes
    pub image_size: Option<u64>,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

/// Fields of an entry before the store has assigned an id and timestamp.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub name: String,
    pub description: String,
    pub artifact_ref: String,
    pub artifact_filename: String,
    pub artifact_size: u64,
    pub artifact_checksum: String,
    pub image_ref: Option<String>,
    pub image_filename: Option<String>,
    pub image_size: Option<u64>,
}

/// Catalog ledger
pub struct CatalogStore {
    db: sled::Db,
}

impl CatalogStore {
    /// Open or create the ledger database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened catalog ledger");
        Ok(Self { db })
    }

    /// Append a record, assigning a fresh id.
    ///
    /// The ledger is flushed before returning, and the entry is visible to
    /// `list`/`get` immediately.
    pub async fn create(&self, draft: EntryDraft) -> Result<CatalogEntry, CatalogError> {
        let id = self.db.generate_id()?;
        let entry = CatalogEntry {
            id,
            name: draft.name,
            description: draft.description,
            artifact_ref: draft.artifact_ref,
            artifact_filename: draft.artifact_filename,
            artifact_size: draft.artifact_size,
            artifact_checksum: draft.artifact_checksum,
            image_ref: draft.image_ref,
            image_filename: draft.image_filename,
            image_size: draft.image_size,
            created_at: Utc::now(),
        };

        let value = encode_entry(&entry)?;
        self.db.insert(id.to_be_bytes(), value)?;
        self.db.flush_async().await?;

        debug!(id, name = %entry.name, "Created catalog entry");
        Ok(entry)
    }

    /// Get an entry by id
    pub fn get(&self, id: u64) -> Result<Option<CatalogEntry>, CatalogError> {
        match self.db.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(decode_entry(&value)?)),
            None => Ok(None),
        }
    }

    /// List all entries in insertion order
    pub fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::with_capacity(self.db.len());
        for item in self.db.iter() {
            let (_, value) = item?;
            entries.push(decode_entry(&value)?);
        }
        Ok(entries)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Whether the ledger holds no entries
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Remove an entry by id.
    ///
    /// The removal is flushed to stable storage before the removed record is
    /// handed back, so callers can reclaim the referenced blobs knowing the
    /// ledger no longer points at them. Returns `None` when the id is absent.
    pub async fn delete(&self, id: u64) -> Result<Option<CatalogEntry>, CatalogError> {
        let Some(value) = self.db.remove(id.to_be_bytes())? else {
            return Ok(None);
        };
        self.db.flush_async().await?;

        let entry = decode_entry(&value)?;
        info!(id, name = %entry.name, "Deleted catalog entry");
        Ok(Some(entry))
    }
}

fn encode_entry(entry: &CatalogEntry) -> Result<Vec<u8>, CatalogError> {
    rmp_serde::to_vec(entry).map_err(|e| CatalogError::Encode(e.to_string()))
}

fn decode_entry(value: &[u8]) -> Result<CatalogEntry, CatalogError> {
    rmp_serde::from_slice(value).map_err(|e| CatalogError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(name: &str) -> EntryDraft {
        EntryDraft {
            name: name.to_string(),
            description: "a test entry".to_string(),
            artifact_ref: format!("token-{name}.apk"),
            artifact_filename: format!("{name}.apk"),
            artifact_size: 10,
            artifact_checksum: "sha256-0000".to_string(),
            image_ref: None,
            image_filename: None,
            image_size: None,
        }
    }

    fn create_store() -> (CatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("catalog.sled")).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn create_then_get_round_trips_all_fields() {
        let (store, _temp) = create_store();
        let created = store.create(draft("demo")).await.unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "demo");
        assert_eq!(fetched.artifact_size, 10);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let (store, _temp) = create_store();
        for name in ["first", "second", "third"] {
            store.create(draft(name)).await.unwrap();
        }

        let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn ids_are_unique_and_never_reused_after_delete() {
        let (store, _temp) = create_store();
        let a = store.create(draft("a")).await.unwrap();
        let b = store.create(draft("b")).await.unwrap();
        assert!(b.id > a.id);

        store.delete(b.id).await.unwrap().unwrap();
        let c = store.create(draft("c")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn delete_returns_the_removed_record_once() {
        let (store, _temp) = create_store();
        let entry = store.create(draft("doomed")).await.unwrap();

        let removed = store.delete(entry.id).await.unwrap().unwrap();
        assert_eq!(removed.artifact_ref, entry.artifact_ref);
        assert!(store.get(entry.id).unwrap().is_none());
        assert!(store.delete(entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.sled");

        let id = {
            let store = CatalogStore::open(&path).unwrap();
            let entry = store.create(draft("durable")).await.unwrap();
            entry.id
        };

        let reopened = CatalogStore::open(&path).unwrap();
        let entry = reopened.get(id).unwrap().unwrap();
        assert_eq!(entry.name, "durable");
        assert_eq!(reopened.len(), 1);
    }
}
