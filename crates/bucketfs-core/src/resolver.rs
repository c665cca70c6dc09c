//! Existence and directory-ness of paths over a store with no directories.
//!
//! A path is probed in a fixed order:
//!
//! 1. the literal key, respecting the path's own directory flag
//! 2. the key plus `/` (an explicit directory marker), unless the key
//!    already ends in `/`
//! 3. a one-entry listing of `key/` as a prefix; any match means an
//!    implicit directory
//!
//! The order matters. With both `a` and `a/` stored, `/b/a` resolves to the
//! file and `/b/a/` to the directory.

use std::sync::Arc;

use tracing::trace;

use crate::attributes::AttributeSnapshot;
use crate::error::FsResult;
use crate::path::{BucketPath, SEPARATOR};
use crate::store::{ObjectMeta, ObjectStore, StoreError};

/// How a directory exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryKind {
    /// The bucket itself.
    BucketRoot,
    /// An explicit marker object whose key ends in `/`.
    Marker(ObjectMeta),
    /// Implied by deeper keys; has no object of its own.
    Implicit,
}

/// Full probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    Absent,
    File(ObjectMeta),
    Directory(DirectoryKind),
}

/// Reduced probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Absent,
    File,
    Directory,
}

impl Existence {
    pub fn state(&self) -> PathState {
        match self {
            Self::Absent => PathState::Absent,
            Self::File(_) => PathState::File,
            Self::Directory(_) => PathState::Directory,
        }
    }

    /// Basic attributes for whatever was found.
    ///
    /// Implicit directories and bucket roots get synthesized zero-size
    /// directory attributes.
    pub fn attributes(&self, key: &str) -> Option<AttributeSnapshot> {
        match self {
            Self::Absent => None,
            Self::File(meta) => Some(AttributeSnapshot::file(meta)),
            Self::Directory(DirectoryKind::Marker(meta)) => {
                Some(AttributeSnapshot::directory_marker(meta))
            }
            Self::Directory(DirectoryKind::Implicit) => {
                Some(AttributeSnapshot::implicit_directory(key))
            }
            Self::Directory(DirectoryKind::BucketRoot) => Some(AttributeSnapshot::bucket_root()),
        }
    }

    /// True when a stored object backs this result.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::File(_) | Self::Directory(DirectoryKind::Marker(_)))
    }
}

/// Probes the store to decide what a path is.
#[derive(Debug)]
pub struct VirtualDirectoryResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for VirtualDirectoryResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ObjectStore> VirtualDirectoryResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether `path` is absent, a file or a directory.
    pub fn exists(&self, path: &BucketPath) -> FsResult<PathState> {
        Ok(self.resolve(path)?.state())
    }

    /// Probes `path`, returning what backs it.
    pub fn resolve(&self, path: &BucketPath) -> FsResult<Existence> {
        let bucket = path.require_bucket()?;
        let key = path.key();

        if key.is_empty() {
            return Ok(if self.store.head_bucket(bucket)? {
                Existence::Directory(DirectoryKind::BucketRoot)
            } else {
                Existence::Absent
            });
        }

        trace!(bucket, key = %key, "probing literal key");
        match self.store.head_object(bucket, &key) {
            Ok(Some(meta)) if key.ends_with(SEPARATOR) => {
                return Ok(Existence::Directory(DirectoryKind::Marker(meta)));
            }
            Ok(Some(meta)) => return Ok(Existence::File(meta)),
            Ok(None) => {}
            Err(StoreError::NoSuchBucket { .. }) => return Ok(Existence::Absent),
            Err(e) => return Err(e.into()),
        }

        let dir_key = if key.ends_with(SEPARATOR) {
            key
        } else {
            let marker = format!("{key}{SEPARATOR}");
            trace!(bucket, key = %marker, "probing directory marker");
            if let Some(meta) = self.store.head_object(bucket, &marker)? {
                return Ok(Existence::Directory(DirectoryKind::Marker(meta)));
            }
            marker
        };

        if self.has_entries_under(bucket, &dir_key)? {
            Ok(Existence::Directory(DirectoryKind::Implicit))
        } else {
            Ok(Existence::Absent)
        }
    }

    /// True if any key other than the directory's own marker lives under
    /// the directory spelling of `path`.
    pub fn has_children(&self, path: &BucketPath) -> FsResult<bool> {
        let bucket = path.require_bucket()?;
        let dir = path.with_directory(true);
        let prefix = dir.key();
        let page = self.store.list_objects(bucket, &prefix, None, 2)?;
        Ok(page.entries.iter().any(|e| e.key != prefix))
    }

    fn has_entries_under(&self, bucket: &str, prefix: &str) -> FsResult<bool> {
        trace!(bucket, prefix, "probing prefix listing");
        let page = self.store.list_objects(bucket, prefix, None, 1)?;
        Ok(!page.entries.is_empty())
    }
}
