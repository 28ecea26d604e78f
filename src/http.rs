//! HTTP API for the catalog
//!
//! REST endpoints over the catalog service:
//!
//! - `GET    /health` - Health check with storage counters
//! - `GET    /catalog` - List all entries (insertion order)
//! - `POST   /catalog` - Submit an artifact (multipart form)
//! - `GET    /catalog/{id}` - Fetch one entry
//! - `GET    /catalog/{id}/artifact` - Download the artifact binary
//! - `GET    /catalog/{id}/image` - Fetch the preview image
//! - `DELETE /catalog/{id}` - Remove an entry and reclaim its blobs
//!
//! The upload form carries `name`, `description`, `artifactFile` and an
//! optional `imageFile`. Bodies are capped at the configured
//! `max_upload_bytes`; oversized uploads are answered with 413 before
//! anything is stored.
//!
//! ## Example Usage
//!
//! ```bash
//! # Publish an artifact
//! curl -F name=Demo -F description="demo app" \
//!      -F artifactFile=@app.apk -F imageFile=@icon.png \
//!      http://localhost:8080/catalog
//!
//! # List the catalog
//! curl http://localhost:8080/catalog
//!
//! # Download an artifact
//! curl -OJ http://localhost:8080/catalog/3/artifact
//! ```

use crate::error::CatalogError;
use crate::response;
use crate::service::CatalogService;
use crate::validate::{FilePart, Submission};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use multer::Multipart;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// HTTP server state
pub struct HttpServer {
    service: Arc<CatalogService>,
    bind_addr: SocketAddr,
    max_upload_bytes: u64,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(service: Arc<CatalogService>, bind_addr: SocketAddr, max_upload_bytes: u64) -> Self {
        Self {
            service,
            bind_addr,
            max_upload_bytes,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), CatalogError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Route requests to handlers
    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        debug!(method = %method, path = %path, "Incoming request");

        if method == Method::OPTIONS {
            return Ok(response::cors_preflight());
        }

        let result = match (method, path.as_str()) {
            (Method::GET, "/health") => self.handle_health().await,

            (Method::GET, "/catalog") => self.handle_list(),
            (Method::POST, "/catalog") => self.handle_submit(req).await,

            (Method::GET, p) if p.starts_with("/catalog/") => match parse_catalog_path(p) {
                Some((id, None)) => self.handle_get(id),
                Some((id, Some("artifact"))) => self.handle_artifact(id).await,
                Some((id, Some("image"))) => self.handle_image(id).await,
                _ => Ok(response::not_found("no such route")),
            },

            (Method::DELETE, p) if p.starts_with("/catalog/") => match parse_catalog_path(p) {
                Some((id, None)) => self.handle_remove(id).await,
                _ => Ok(response::not_found("no such route")),
            },

            _ => Ok(response::not_found("no such route")),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => response::error_response(&e),
        };
        Ok(response::with_cors(response))
    }

    /// Health check endpoint
    async fn handle_health(&self) -> Result<Response<Full<Bytes>>, CatalogError> {
        let stats = self.service.stats().await?;
        let body = serde_json::json!({
            "status": "ok",
            "entries": stats.entries,
            "blobs": stats.blobs.total_blobs,
            "bytes": stats.blobs.total_bytes,
        });
        Ok(response::ok(&body))
    }

    /// GET /catalog - list entries in insertion order
    fn handle_list(&self) -> Result<Response<Full<Bytes>>, CatalogError> {
        let entries = self.service.list()?;
        Ok(response::ok(&entries))
    }

    /// GET /catalog/{id}
    fn handle_get(&self, id: u64) -> Result<Response<Full<Bytes>>, CatalogError> {
        let entry = self.service.get(id)?;
        Ok(response::ok(&entry))
    }

    /// POST /catalog - multipart upload
    async fn handle_submit(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, CatalogError> {
        let (parts, body) = req.into_parts();

        let boundary = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| multer::parse_boundary(ct).ok())
            .ok_or_else(|| {
                CatalogError::Multipart("expected a multipart/form-data request".to_string())
            })?;

        // Reject declared-oversize bodies up front; the Limited wrapper below
        // still catches bodies that lie about their length.
        if let Some(declared) = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            if declared > self.max_upload_bytes {
                return Err(CatalogError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
        }

        let limited = Limited::new(body, self.max_upload_bytes as usize);
        let submission = self
            .read_submission(Multipart::new(limited.into_data_stream(), boundary))
            .await?;

        let entry = self.service.submit(submission).await?;
        Ok(response::created(&entry))
    }

    /// Drain the multipart stream into a `Submission` bundle.
    async fn read_submission(
        &self,
        mut multipart: Multipart<'static>,
    ) -> Result<Submission, CatalogError> {
        let mut submission = Submission::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| self.map_multipart_error(e))?
        {
            let field_name = field.name().map(|s| s.to_string());
            match field_name.as_deref() {
                Some("name") => {
                    submission.name = field
                        .text()
                        .await
                        .map_err(|e| self.map_multipart_error(e))?;
                }
                Some("description") => {
                    submission.description = field
                        .text()
                        .await
                        .map_err(|e| self.map_multipart_error(e))?;
                }
                Some("artifactFile") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| self.map_multipart_error(e))?;
                    submission.artifact = Some(FilePart { filename, bytes });
                }
                Some("imageFile") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| self.map_multipart_error(e))?;
                    submission.image = Some(FilePart { filename, bytes });
                }
                _ => {}
            }
        }

        // Parts without a filename are treated as absent rather than invalid.
        submission.artifact = submission.artifact.filter(|f| !f.filename.is_empty());
        submission.image = submission.image.filter(|f| !f.filename.is_empty());

        Ok(submission)
    }

    fn map_multipart_error(&self, err: multer::Error) -> CatalogError {
        match err {
            multer::Error::StreamReadFailed(inner)
                if inner.downcast_ref::<LengthLimitError>().is_some() =>
            {
                CatalogError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                }
            }
            other => CatalogError::Multipart(other.to_string()),
        }
    }

    /// GET /catalog/{id}/artifact - download the binary
    async fn handle_artifact(&self, id: u64) -> Result<Response<Full<Bytes>>, CatalogError> {
        let (entry, data) = self.service.open_artifact(id).await?;

        info!(id, size = data.len(), "Serving artifact");

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, data.len())
            .header(
                header::CONTENT_DISPOSITION,
                attachment_disposition(&entry.artifact_filename),
            )
            .body(Full::new(Bytes::from(data)))
            .unwrap())
    }

    /// GET /catalog/{id}/image - fetch the preview image
    async fn handle_image(&self, id: u64) -> Result<Response<Full<Bytes>>, CatalogError> {
        let (entry, data) = self.service.open_image(id).await?;

        let content_type = entry
            .image_filename
            .as_deref()
            .map(image_content_type)
            .unwrap_or("application/octet-stream");

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, data.len())
            .body(Full::new(Bytes::from(data)))
            .unwrap())
    }

    /// DELETE /catalog/{id}
    async fn handle_remove(&self, id: u64) -> Result<Response<Full<Bytes>>, CatalogError> {
        self.service.remove(id).await?;
        Ok(response::no_content())
    }
}

/// Parse `/catalog/{id}` and `/catalog/{id}/{tail}` paths.
fn parse_catalog_path(path: &str) -> Option<(u64, Option<&str>)> {
    let rest = path.strip_prefix("/catalog/")?;
    let (id_part, tail) = match rest.split_once('/') {
        Some((id_part, tail)) => (id_part, Some(tail)),
        None => (rest, None),
    };
    let id = id_part.parse().ok()?;
    Some((id, tail))
}

/// `Content-Disposition: attachment` carrying the original upload filename.
fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let safe = if safe.is_empty() {
        "artifact"
    } else {
        safe.as_str()
    };
    format!("attachment; filename=\"{}\"", safe)
}

/// Guess a raster content type from the image filename extension.
fn image_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
