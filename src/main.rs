//! depot daemon
//!
//! Serves the artifact catalog over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! depot
//!
//! # Start with custom config
//! depot --config /path/to/config.toml
//!
//! # Start with custom HTTP port
//! depot --http-port 9090
//!
//! # Start with custom storage directory
//! depot --storage-dir /data/depot
//!
//! # Require a preview image on every submission
//! depot --require-image
//! ```

use clap::Parser;
use depot::{BlobStore, CatalogService, CatalogStore, Config, HttpServer, UploadPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(about = "Self-hosted artifact catalog")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "DEPOT_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "DEPOT_HTTP_PORT")]
    http_port: Option<u16>,

    /// Require a preview image on every submission
    #[arg(long, env = "DEPOT_REQUIRE_IMAGE")]
    require_image: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("depot=info".parse()?))
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if args.require_image {
        config.require_image = true;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        require_image = config.require_image,
        "Starting depot"
    );

    // Ensure storage directory exists
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    // Initialize stores and service
    let blob_store = Arc::new(BlobStore::new(config.blobs_dir()).await?);
    let catalog = Arc::new(CatalogStore::open(config.catalog_db_path())?);
    let service = Arc::new(CatalogService::new(
        blob_store.clone(),
        catalog,
        UploadPolicy {
            require_image: config.require_image,
        },
    ));

    // Start HTTP server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(
        service.clone(),
        http_addr,
        config.max_upload_bytes,
    ));

    info!("HTTP API available at http://{}", http_addr);
    info!("Endpoints:");
    info!("  GET    /health                 - Health check");
    info!("  GET    /catalog                - List entries");
    info!("  POST   /catalog                - Submit an artifact (multipart)");
    info!("  GET    /catalog/{{id}}           - Fetch one entry");
    info!("  GET    /catalog/{{id}}/artifact  - Download the artifact");
    info!("  GET    /catalog/{{id}}/image     - Fetch the preview image");
    info!("  DELETE /catalog/{{id}}           - Remove an entry");

    info!("Press Ctrl+C to stop.");

    // Handle shutdown signal
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    // Run HTTP server with graceful shutdown
    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    // Print stats before exit
    if let Ok(stats) = service.stats().await {
        info!(
            entries = stats.entries,
            blobs = stats.blobs.total_blobs,
            bytes = stats.blobs.total_bytes,
            "Final storage stats"
        );
    }

    Ok(())
}
