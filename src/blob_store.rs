//! Blob storage
//!
//! Stores file content in a flat local directory keyed by generated storage
//! names (see `naming`). Writes go to a temp file in the same directory and
//! are renamed into place, so a partially written blob is never observable
//! under its final name.

use crate::error::CatalogError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Suffix of in-flight temp files, skipped by `stats`.
const PART_SUFFIX: &str = ".part";

/// Result of storing a blob
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Storage name the blob was written under
    pub name: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// SHA256 checksum of the stored bytes
    pub checksum: String,
}

/// Storage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobStats {
    pub total_blobs: u64,
    pub total_bytes: u64,
}

/// Blob storage manager
pub struct BlobStore {
    /// Root directory for blob storage
    root_dir: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given directory
    pub async fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self, CatalogError> {
        let root_dir = root_dir.as_ref().to_path_buf();

        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Initialized blob store");

        Ok(Self { root_dir })
    }

    /// Compute the SHA256 checksum of data
    pub fn compute_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("sha256-{}", hex::encode(hasher.finalize()))
    }

    /// Resolve a storage name to its on-disk path.
    ///
    /// Storage names must be single path components; anything that could
    /// escape the blob directory is rejected rather than joined.
    fn blob_path(&self, name: &str) -> Result<PathBuf, CatalogError> {
        let safe = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !safe {
            return Err(CatalogError::InvalidName(name.to_string()));
        }
        Ok(self.root_dir.join(name))
    }

    /// Store a blob under the given storage name.
    ///
    /// The write is atomic: content lands in a `.part` temp file which is
    /// fsynced and then renamed over the final name. Overwriting an existing
    /// name should never happen with generated names and is logged as a
    /// warning; the rename still gives last-writer-wins without a torn file.
    pub async fn put(&self, name: &str, data: &[u8]) -> Result<StoredBlob, CatalogError> {
        let blob_path = self.blob_path(name)?;

        if fs::metadata(&blob_path).await.is_ok() {
            warn!(name = %name, "Overwriting existing blob; generated names should be unique");
        }

        let temp_path = self
            .root_dir
            .join(format!("{}.{}{}", name, Uuid::new_v4().simple(), PART_SUFFIX));

        let write_result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        fs::rename(&temp_path, &blob_path).await?;

        let checksum = Self::compute_checksum(data);
        info!(name = %name, size = data.len(), "Stored blob");

        Ok(StoredBlob {
            name: name.to_string(),
            size_bytes: data.len() as u64,
            checksum,
        })
    }

    /// Check if a blob exists
    pub async fn exists(&self, name: &str) -> bool {
        match self.blob_path(name) {
            Ok(path) => fs::metadata(path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Retrieve a blob's exact bytes by storage name
    pub async fn get(&self, name: &str) -> Result<Vec<u8>, CatalogError> {
        let blob_path = self.blob_path(name)?;

        match fs::read(&blob_path).await {
            Ok(data) => {
                debug!(name = %name, size = data.len(), "Read blob");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CatalogError::BlobNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Idempotent: deleting an absent name is not an error, since a prior
    /// partial-failure cleanup may already have reclaimed it. Returns whether
    /// a file was actually removed.
    pub async fn delete(&self, name: &str) -> Result<bool, CatalogError> {
        let blob_path = self.blob_path(name)?;

        match fs::remove_file(&blob_path).await {
            Ok(()) => {
                info!(name = %name, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Get storage statistics
    pub async fn stats(&self) -> Result<BlobStats, CatalogError> {
        let mut stats = BlobStats::default();

        let mut entries = fs::read_dir(&self.root_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if file_name.to_string_lossy().ends_with(PART_SUFFIX) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                stats.total_blobs += 1;
                stats.total_bytes += metadata.len();
            }
        }

        Ok(stats)
    }
}
