//! depot - self-hosted artifact catalog
//!
//! Clients publish an application binary (plus an optional preview image and
//! textual metadata); depot persists the binary durably, records a catalog
//! entry, and serves enumeration, download, and removal of entries.
//!
//! ## Architecture
//!
//! - **Blob store**: file bytes under generated collision-free names
//! - **Catalog ledger**: sled-backed metadata records, flushed per mutation
//! - **Catalog service**: the upload transaction tying the two together
//! - **HTTP API**: thin hyper front over the service
//!
//! The upload transaction writes blobs before the record that references
//! them and deletes records before reclaiming their blobs, so a failure at
//! any point leaves at worst a transient orphaned blob - never a catalog
//! entry pointing at missing content.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/depot/
//! ├── blobs/                          # One file per stored blob
//! │   ├── 3f2a...9c-app.apk           # {random token}-{sanitized filename}
//! │   └── 81d0...44-icon.png
//! ├── catalog.sled/                   # Catalog ledger
//! └── config.toml                     # Configuration
//! ```

pub mod blob_store;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod naming;
pub mod response;
pub mod service;
pub mod validate;

// Re-exports
pub use blob_store::{BlobStats, BlobStore, StoredBlob};
pub use catalog::{CatalogEntry, CatalogStore, EntryDraft};
pub use config::Config;
pub use error::CatalogError;
pub use http::HttpServer;
pub use naming::storage_name;
pub use service::{CatalogService, ServiceStats};
pub use validate::{FilePart, Submission, UploadPolicy, ValidationError};
