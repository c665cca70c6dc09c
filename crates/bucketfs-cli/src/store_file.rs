//! Persistence of the in-memory store as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bucketfs_core::store::{MemoryStore, MemoryStoreSnapshot};

/// Default store location, next to the config file.
pub fn default_path() -> Result<PathBuf> {
    Ok(crate::config::config_dir()?.join("store.json"))
}

/// Loads the store at `path`, or an empty store if the file does not exist.
pub fn load(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "store file not found, starting empty");
        return Ok(MemoryStore::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store file: {}", path.display()))?;
    let snapshot: MemoryStoreSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse store file: {}", path.display()))?;
    Ok(MemoryStore::from_snapshot(snapshot))
}

/// Writes the store to `path`, creating parent directories as needed.
pub fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write store file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "saved store");
    Ok(())
}
