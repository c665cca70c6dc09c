//! Live filesystems keyed by connection identity.
//!
//! At most one [`FileSystem`] exists per identity. Creating a second one for
//! the same identity fails instead of handing back a silent duplicate.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

use crate::config::{DEFAULT_ENDPOINT, FsConfig};
use crate::error::{FsError, FsResult};
use crate::ops::FileSystem;
use crate::store::ObjectStore;

/// Normalized `access_key@endpoint` identity of a store connection.
///
/// The endpoint is lowercased, loses any URL scheme and trailing slash, and
/// falls back to the default endpoint when blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(access_key: Option<&str>, endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        let endpoint = endpoint
            .split_once("://")
            .map_or(endpoint, |(_, rest)| rest)
            .trim_end_matches('/');
        let endpoint = if endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_owned()
        } else {
            endpoint.to_ascii_lowercase()
        };
        match access_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self(format!("{key}@{endpoint}")),
            None => Self(endpoint),
        }
    }

    pub fn from_config(config: &FsConfig) -> Self {
        Self::new(config.access_key.as_deref(), &config.endpoint)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owned registry of open filesystems.
pub struct FileSystemRegistry<S> {
    filesystems: DashMap<ConnectionId, Arc<FileSystem<S>>>,
}

impl<S> Default for FileSystemRegistry<S> {
    fn default() -> Self {
        Self {
            filesystems: DashMap::new(),
        }
    }
}

impl<S> fmt::Debug for FileSystemRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemRegistry")
            .field("open", &self.filesystems.len())
            .finish()
    }
}

impl<S: ObjectStore> FileSystemRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a filesystem for `config`'s identity.
    ///
    /// Fails with [`FsError::AlreadyExists`] if one is already open. The
    /// check and the insert happen under the same shard lock.
    pub fn create(&self, config: FsConfig, store: Arc<S>) -> FsResult<Arc<FileSystem<S>>> {
        let id = ConnectionId::from_config(&config);
        match self.filesystems.entry(id) {
            Entry::Occupied(entry) => Err(FsError::already_exists(entry.key())),
            Entry::Vacant(entry) => {
                info!(connection = %entry.key(), "opening filesystem");
                let fs = Arc::new(FileSystem::new(store, config));
                entry.insert(Arc::clone(&fs));
                Ok(fs)
            }
        }
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<FileSystem<S>>> {
        self.filesystems.get(id).map(|fs| Arc::clone(fs.value()))
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.filesystems.contains_key(id)
    }

    /// Removes the filesystem for `id`, dropping its cache. Returns whether
    /// one was open.
    pub fn close(&self, id: &ConnectionId) -> bool {
        match self.filesystems.remove(id) {
            Some((id, fs)) => {
                fs.cache().invalidate_all();
                info!(connection = %id, "closed filesystem");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.filesystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filesystems.is_empty()
    }
}
