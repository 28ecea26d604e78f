//! Configuration for depot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage directory for blobs and the catalog ledger
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port for the catalog
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Whether submissions must include a preview image
    #[serde(default)]
    pub require_image: bool,

    /// Maximum accepted upload body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_http_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> u64 {
    256 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            require_image: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get blobs directory
    pub fn blobs_dir(&self) -> PathBuf {
        self.storage_dir.join("blobs")
    }

    /// Get catalog ledger path
    pub fn catalog_db_path(&self) -> PathBuf {
        self.storage_dir.join("catalog.sled")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.http_port = 9191;
        config.require_image = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.http_port, 9191);
        assert!(loaded.require_image);
        assert_eq!(loaded.max_upload_bytes, default_max_upload_bytes());
    }

    #[test]
    fn derived_paths_live_under_storage_dir() {
        let config = Config {
            storage_dir: PathBuf::from("/data/depot"),
            ..Config::default()
        };
        assert_eq!(config.blobs_dir(), PathBuf::from("/data/depot/blobs"));
        assert_eq!(
            config.catalog_db_path(),
            PathBuf::from("/data/depot/catalog.sled")
        );
    }
}
