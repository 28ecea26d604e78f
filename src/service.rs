//! Catalog service
//!
//! Composes the validator, storage-name generator, blob store, and catalog
//! ledger into the upload transaction, and owns the consistency rules between
//! records and their backing blobs. Constructed once at startup and shared by
//! reference with the HTTP layer; there is no ambient global state.
//!
//! ## Upload ordering
//!
//! `submit` writes blobs strictly before the record that references them, and
//! `remove` deletes the record durably before reclaiming its blobs. Together
//! these bound any failure window to transient orphaned blobs - never a live
//! record pointing at missing content. Compensation on a failed upload is
//! best-effort: a blob that cannot be cleaned up is logged and left for an
//! offline sweep.

use crate::blob_store::{BlobStats, BlobStore, StoredBlob};
use crate::catalog::{CatalogEntry, CatalogStore, EntryDraft};
use crate::error::CatalogError;
use crate::naming::storage_name;
use crate::validate::{validate, FilePart, Submission, UploadPolicy};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Catalog service state shared across request handlers
pub struct CatalogService {
    blobs: Arc<BlobStore>,
    catalog: Arc<CatalogStore>,
    policy: UploadPolicy,
}

/// Snapshot of service counters for the health endpoint
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    pub entries: usize,
    pub blobs: BlobStats,
}

impl CatalogService {
    pub fn new(blobs: Arc<BlobStore>, catalog: Arc<CatalogStore>, policy: UploadPolicy) -> Self {
        Self {
            blobs,
            catalog,
            policy,
        }
    }

    /// Run the upload transaction for one submission.
    ///
    /// Ordering is strict: validate (no side effects on rejection), generate
    /// storage names, write the artifact blob, write the image blob, confirm
    /// both writes landed, then commit the catalog record. Every failure
    /// after the first blob write compensates by deleting whatever was
    /// already stored before surfacing the error.
    pub async fn submit(&self, mut submission: Submission) -> Result<CatalogEntry, CatalogError> {
        validate(&submission, &self.policy)?;

        let Some(artifact) = submission.artifact.take() else {
            // Unreachable after validation; kept as a typed error rather
            // than a panic.
            return Err(crate::validate::ValidationError::MissingArtifact.into());
        };
        let image = submission
            .image
            .take()
            .filter(|part| !part.filename.is_empty());

        let artifact_name = storage_name(&artifact.filename);
        let stored_artifact = self.blobs.put(&artifact_name, &artifact.bytes).await?;

        let stored_image = match &image {
            Some(part) => Some(self.store_image(part, &artifact_name).await?),
            None => None,
        };

        // Defensive check against silent write failures before the record
        // becomes visible.
        if let Err(e) = self
            .confirm_blobs(&artifact_name, stored_image.as_ref())
            .await
        {
            self.discard_blob(&artifact_name).await;
            if let Some(stored) = &stored_image {
                self.discard_blob(&stored.name).await;
            }
            return Err(e);
        }

        let draft = EntryDraft {
            name: submission.name,
            description: submission.description,
            artifact_ref: stored_artifact.name.clone(),
            artifact_filename: artifact.filename,
            artifact_size: stored_artifact.size_bytes,
            artifact_checksum: stored_artifact.checksum,
            image_ref: stored_image.as_ref().map(|s| s.name.clone()),
            image_filename: image.as_ref().map(|p| p.filename.clone()),
            image_size: stored_image.as_ref().map(|s| s.size_bytes),
        };

        match self.catalog.create(draft).await {
            Ok(entry) => {
                info!(
                    id = entry.id,
                    name = %entry.name,
                    artifact = %entry.artifact_ref,
                    size = entry.artifact_size,
                    "Published catalog entry"
                );
                Ok(entry)
            }
            Err(e) => {
                warn!(error = %e, "Ledger commit failed; reclaiming uploaded blobs");
                self.discard_blob(&artifact_name).await;
                if let Some(stored) = &stored_image {
                    self.discard_blob(&stored.name).await;
                }
                Err(e)
            }
        }
    }

    /// Write the image blob, compensating for the already-written artifact
    /// blob on failure so it cannot linger as an orphan.
    async fn store_image(
        &self,
        image: &FilePart,
        artifact_name: &str,
    ) -> Result<StoredBlob, CatalogError> {
        let image_name = storage_name(&image.filename);
        match self.blobs.put(&image_name, &image.bytes).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                warn!(error = %e, artifact = %artifact_name, "Image write failed; reclaiming artifact blob");
                self.discard_blob(artifact_name).await;
                Err(e)
            }
        }
    }

    async fn confirm_blobs(
        &self,
        artifact_name: &str,
        image: Option<&StoredBlob>,
    ) -> Result<(), CatalogError> {
        if !self.blobs.exists(artifact_name).await {
            return Err(CatalogError::Internal(format!(
                "artifact blob {artifact_name} missing after write"
            )));
        }
        if let Some(stored) = image {
            if !self.blobs.exists(&stored.name).await {
                return Err(CatalogError::Internal(format!(
                    "image blob {} missing after write",
                    stored.name
                )));
            }
        }
        Ok(())
    }

    /// Best-effort blob removal; failures are logged, never propagated.
    async fn discard_blob(&self, name: &str) {
        if let Err(e) = self.blobs.delete(name).await {
            warn!(name = %name, error = %e, "Failed to reclaim blob; leaving orphan for offline sweep");
        }
    }

    /// List all entries in insertion order
    pub fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.catalog.list()
    }

    /// Get an entry by id
    pub fn get(&self, id: u64) -> Result<CatalogEntry, CatalogError> {
        self.catalog.get(id)?.ok_or(CatalogError::EntryNotFound(id))
    }

    /// Resolve an entry and read its artifact bytes.
    ///
    /// A record whose blob is missing is an invariant breach from
    /// pre-existing corruption; it is logged loudly and served as a degraded
    /// not-found rather than a crash.
    pub async fn open_artifact(&self, id: u64) -> Result<(CatalogEntry, Vec<u8>), CatalogError> {
        let entry = self.get(id)?;
        match self.blobs.get(&entry.artifact_ref).await {
            Ok(bytes) => Ok((entry, bytes)),
            Err(CatalogError::BlobNotFound(blob)) => {
                error!(id, blob = %blob, "Catalog entry references a missing artifact blob");
                Err(CatalogError::MissingBlob { id, blob })
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve an entry and read its preview image bytes.
    pub async fn open_image(&self, id: u64) -> Result<(CatalogEntry, Vec<u8>), CatalogError> {
        let entry = self.get(id)?;
        let Some(image_ref) = entry.image_ref.clone() else {
            return Err(CatalogError::NoImage(id));
        };
        match self.blobs.get(&image_ref).await {
            Ok(bytes) => Ok((entry, bytes)),
            Err(CatalogError::BlobNotFound(blob)) => {
                error!(id, blob = %blob, "Catalog entry references a missing image blob");
                Err(CatalogError::MissingBlob { id, blob })
            }
            Err(e) => Err(e),
        }
    }

    /// Delete an entry and reclaim its blobs.
    ///
    /// The ledger removal is durable before any blob is touched; blob
    /// deletion is best-effort and a failure leaves a reclaimable orphan
    /// rather than a dangling catalog reference.
    pub async fn remove(&self, id: u64) -> Result<CatalogEntry, CatalogError> {
        let removed = self
            .catalog
            .delete(id)
            .await?
            .ok_or(CatalogError::EntryNotFound(id))?;

        self.discard_blob(&removed.artifact_ref).await;
        if let Some(image_ref) = &removed.image_ref {
            self.discard_blob(image_ref).await;
        }

        info!(id, name = %removed.name, "Removed catalog entry and reclaimed blobs");
        Ok(removed)
    }

    /// Counters for the health endpoint
    pub async fn stats(&self) -> Result<ServiceStats, CatalogError> {
        Ok(ServiceStats {
            entries: self.catalog.len(),
            blobs: self.blobs.stats().await?,
        })
    }
}
