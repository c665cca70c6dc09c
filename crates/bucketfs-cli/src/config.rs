//! Configuration file support.
//!
//! The file holds the same fields as [`FsConfig`], all optional:
//!
//! ```toml
//! cache_ttl = "30s"
//! cache_capacity = 10000
//! list_page_size = 500
//! endpoint = "minio.local:9000"
//! identity = "owner-id"
//! ```
//!
//! Without `--config`, `config.toml` in the user config directory is used if
//! it exists. `BUCKETFS_CONFIG_DIR` overrides that directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bucketfs_core::FsConfig;

/// Loads the explicit file, or the default file if present, or defaults.
pub fn load(explicit: Option<&Path>) -> Result<FsConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_dir()?.join("config.toml");
            if !path.exists() {
                return Ok(FsConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FsConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Directory holding `config.toml` and the default store.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("BUCKETFS_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let dirs = directories::ProjectDirs::from("com", "bucketfs", "bucketfs")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(dirs.config_dir().to_path_buf())
}
