//! Filesystem operations over an object store.
//!
//! [`FileSystem`] ties the store, the attribute cache and the directory
//! resolver together. Each operation is a short, synchronous transaction
//! against the store; the only state kept between calls is the cache.
//!
//! Every mutation invalidates the cache for the touched path under both
//! spellings, plus its ancestors, since a new key can turn a cached
//! "absent" parent into an implicit directory.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::attributes::{
    AttributeKind, AttributeSnapshot, AttributeValue, BASIC_ATTRIBUTES, POSIX_ATTRIBUTES,
};
use crate::cache::{AttributeFetcher, AttributesCache, Fetched};
use crate::config::FsConfig;
use crate::error::{FsError, FsResult};
use crate::file_store::FileStore;
use crate::listing::{DirectoryEntries, Walk};
use crate::path::BucketPath;
use crate::resolver::{DirectoryKind, Existence, VirtualDirectoryResolver};
use crate::stats::CacheStatsSnapshot;
use crate::store::{Acl, AclPermission, BucketInfo, ObjectStore};

/// Access modes for [`FileSystem::check_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    Execute,
}

impl AccessMode {
    /// Parses `rwx`-style mode letters. Unknown letters are an error.
    pub fn parse_modes(text: &str) -> FsResult<Vec<AccessMode>> {
        text.chars()
            .map(|c| match c {
                'r' | 'R' => Ok(Self::Read),
                'w' | 'W' => Ok(Self::Write),
                'x' | 'X' => Ok(Self::Execute),
                other => Err(FsError::invalid_argument(format!(
                    "unknown access mode {other:?}"
                ))),
            })
            .collect()
    }
}

/// Options for [`FileSystem::copy`] and [`FileSystem::move_path`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub replace_existing: bool,
    pub atomic_move: bool,
    /// Accepted for compatibility. The store copies metadata regardless.
    pub copy_attributes: bool,
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }

    #[must_use]
    pub fn atomic_move(mut self) -> Self {
        self.atomic_move = true;
        self
    }

    #[must_use]
    pub fn copy_attributes(mut self) -> Self {
        self.copy_attributes = true;
        self
    }
}

/// Loads attributes from the store on a cache miss.
struct StoreFetcher<'a, S> {
    store: &'a S,
    resolver: &'a VirtualDirectoryResolver<S>,
}

impl<S: ObjectStore> AttributeFetcher for StoreFetcher<'_, S> {
    fn fetch(&self, path: &BucketPath, kind: AttributeKind) -> FsResult<Fetched> {
        let existence = self.resolver.resolve(path)?;
        let Some(basic) = existence.attributes(&path.key()) else {
            return Ok(Fetched::Absent);
        };
        let snapshot = match kind {
            AttributeKind::Basic => basic,
            AttributeKind::PosixExtended => {
                let acl = acl_for(self.store, path.require_bucket()?, &existence)?;
                basic.with_posix(&acl)
            }
        };
        Ok(if existence.is_stored() {
            Fetched::Stored(snapshot)
        } else {
            Fetched::Synthesized(snapshot)
        })
    }
}

/// ACL governing what `existence` found: the object's own ACL for stored
/// objects, the bucket's for implicit directories and the bucket root.
fn acl_for<S: ObjectStore>(store: &S, bucket: &str, existence: &Existence) -> FsResult<Acl> {
    let acl = match existence {
        Existence::File(meta) | Existence::Directory(DirectoryKind::Marker(meta)) => {
            store.get_object_acl(bucket, &meta.key)?
        }
        _ => store.get_bucket_acl(bucket)?,
    };
    Ok(acl)
}

fn log_failure(operation: &'static str, path: &BucketPath, err: &FsError) {
    let category = err.category();
    if category.is_expected() {
        debug!(operation, path = %path, error = %err, "operation refused");
    } else {
        warn!(operation, path = %path, category = category.name(), error = %err, "operation failed");
    }
}

/// A filesystem view over one object store connection.
pub struct FileSystem<S> {
    store: Arc<S>,
    resolver: VirtualDirectoryResolver<S>,
    cache: Arc<AttributesCache>,
    config: FsConfig,
}

impl<S> std::fmt::Debug for FileSystem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("endpoint", &self.config.endpoint)
            .field("identity", &self.config.identity)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> FileSystem<S> {
    pub fn new(store: Arc<S>, config: FsConfig) -> Self {
        let cache = Arc::new(AttributesCache::from_config(&config));
        Self {
            resolver: VirtualDirectoryResolver::new(Arc::clone(&store)),
            store,
            cache,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<AttributesCache> {
        &self.cache
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn resolver(&self) -> &VirtualDirectoryResolver<S> {
        &self.resolver
    }

    /// Canonical user id used for ACL checks, if any.
    pub fn identity(&self) -> Option<&str> {
        self.config.identity.as_deref()
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    fn fetcher(&self) -> StoreFetcher<'_, S> {
        StoreFetcher {
            store: &*self.store,
            resolver: &self.resolver,
        }
    }

    /// Drops cached state for `path` and every ancestor directory.
    fn invalidate_lineage(&self, path: &BucketPath) {
        self.cache.invalidate(path);
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            self.cache.invalidate(&dir);
            ancestor = dir.parent();
        }
    }

    // ========================================================================
    // Buckets
    // ========================================================================

    /// One root directory per bucket, in name order.
    #[instrument(level = "debug", skip_all)]
    pub fn root_directories(&self) -> FsResult<Vec<BucketPath>> {
        Ok(self
            .store
            .list_buckets()?
            .into_iter()
            .map(|b| BucketPath::bucket_root(b.name))
            .collect())
    }

    /// Every bucket as a file store, in name order.
    ///
    /// Costs one bucket ACL read per bucket, for the owner.
    #[instrument(level = "debug", skip_all)]
    pub fn file_stores(&self) -> FsResult<Vec<FileStore>> {
        self.store
            .list_buckets()?
            .into_iter()
            .map(|info| self.file_store_for(info))
            .collect()
    }

    /// The file store `path` lives in. A missing bucket is
    /// [`FsError::NotFound`].
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn file_store(&self, path: &BucketPath) -> FsResult<FileStore> {
        let bucket = path.require_bucket()?;
        let info = self
            .store
            .list_buckets()?
            .into_iter()
            .find(|b| b.name == bucket)
            .ok_or_else(|| FsError::not_found(BucketPath::bucket_root(bucket)))
            .inspect_err(|e| log_failure("file_store", path, e))?;
        self.file_store_for(info)
    }

    fn file_store_for(&self, info: BucketInfo) -> FsResult<FileStore> {
        let owner = self.store.get_bucket_acl(&info.name)?.owner;
        Ok(FileStore::new(info, owner))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Attributes of `path` in the requested view.
    ///
    /// Served from the cache when possible. A path confirmed absent is
    /// [`FsError::NotFound`].
    #[instrument(level = "debug", skip_all, fields(path = %path, kind = %kind))]
    pub fn read_attributes(
        &self,
        path: &BucketPath,
        kind: AttributeKind,
    ) -> FsResult<AttributeSnapshot> {
        let snapshot = self
            .cache
            .get(path, kind, &self.fetcher())
            .inspect_err(|e| log_failure("read_attributes", path, e))?
            .ok_or_else(|| FsError::not_found(path))?;
        debug_assert!(
            snapshot.satisfies(kind),
            "{kind} request answered with a {} snapshot",
            snapshot.kind
        );
        Ok(if snapshot.kind == kind {
            snapshot
        } else {
            snapshot.to_basic()
        })
    }

    /// Named attributes as a map, selected by `view:name,name` or `view:*`.
    ///
    /// The view defaults to `basic`. Names not part of the view are skipped.
    #[instrument(level = "debug", skip_all, fields(path = %path, selector = selector))]
    pub fn read_attribute_map(
        &self,
        path: &BucketPath,
        selector: &str,
    ) -> FsResult<BTreeMap<String, AttributeValue>> {
        let (view, names) = selector.split_once(':').unwrap_or(("basic", selector));
        let kind: AttributeKind = view.parse()?;
        let snapshot = self.read_attributes(path, kind)?;

        let wanted: Vec<&str> = if names == "*" {
            let mut all: Vec<&str> = BASIC_ATTRIBUTES.to_vec();
            all.push("fileKey");
            if kind == AttributeKind::PosixExtended {
                all.extend(POSIX_ATTRIBUTES);
            }
            all
        } else {
            names.split(',').map(str::trim).collect()
        };

        Ok(wanted
            .into_iter()
            .filter_map(|name| Some((name.to_owned(), snapshot.attribute(name)?)))
            .collect())
    }

    /// Attribute mutation is not available on object stores.
    pub fn set_attribute(&self, path: &BucketPath, name: &str, _value: &str) -> FsResult<()> {
        Err(FsError::unsupported(format!("set attribute {name} on {path}")))
    }

    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn exists(&self, path: &BucketPath) -> FsResult<bool> {
        Ok(self.cache.get(path, AttributeKind::Basic, &self.fetcher())?.is_some())
    }

    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn is_directory(&self, path: &BucketPath) -> FsResult<bool> {
        Ok(self
            .cache
            .get(path, AttributeKind::Basic, &self.fetcher())?
            .is_some_and(|s| s.is_directory))
    }

    /// Object stores have no hidden files.
    pub fn is_hidden(&self, _path: &BucketPath) -> bool {
        false
    }

    /// Both paths are absolute and name the same location once normalized.
    pub fn is_same_file(&self, a: &BucketPath, b: &BucketPath) -> bool {
        a.is_absolute() && b.is_absolute() && a.normalize() == b.normalize()
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Checks that `path` exists and the caller holds every mode in `modes`.
    ///
    /// Read is judged on the object's ACL, write on the bucket's. Execute
    /// is never available.
    #[instrument(level = "debug", skip_all, fields(path = %path, modes = ?modes))]
    pub fn check_access(&self, path: &BucketPath, modes: &[AccessMode]) -> FsResult<()> {
        self.check_access_inner(path, modes)
            .inspect_err(|e| log_failure("check_access", path, e))
    }

    fn check_access_inner(&self, path: &BucketPath, modes: &[AccessMode]) -> FsResult<()> {
        let bucket = path.require_bucket()?;
        let existence = self.resolver.resolve(path)?;
        if existence == Existence::Absent {
            return Err(FsError::not_found(path));
        }

        let identity = self.identity();
        for mode in modes {
            let (acl, wanted) = match mode {
                AccessMode::Execute => {
                    return Err(FsError::unsupported("execute access"));
                }
                AccessMode::Read => (
                    acl_for(&*self.store, bucket, &existence)?,
                    [AclPermission::Read, AclPermission::FullControl],
                ),
                AccessMode::Write => (
                    self.store.get_bucket_acl(bucket)?,
                    [AclPermission::Write, AclPermission::FullControl],
                ),
            };
            if !acl.allows(identity, &wanted) {
                return Err(FsError::access_denied(
                    path,
                    format!("{mode:?} not granted to {}", identity.unwrap_or("anonymous")),
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Creates an explicit directory marker. Succeeds if it already exists.
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn create_directory(&self, path: &BucketPath) -> FsResult<()> {
        let bucket = path.require_bucket()?;
        if path.is_bucket_root() {
            return if self.store.head_bucket(bucket)? {
                Ok(())
            } else {
                Err(FsError::not_found(path))
            };
        }
        let dir = path.with_directory(true);
        self.store
            .put_object(bucket, &dir.key(), &[])
            .map_err(FsError::from)
            .inspect_err(|e| log_failure("create_directory", path, e))?;
        self.invalidate_lineage(&dir);
        Ok(())
    }

    /// Symbolic links cannot be represented in an object store.
    pub fn create_symbolic_link(&self, link: &BucketPath, _target: &BucketPath) -> FsResult<()> {
        Err(FsError::unsupported(format!("symbolic link {link}")))
    }

    /// Deletes a file or an empty directory.
    ///
    /// Deleting an absent path succeeds. A directory with descendants is
    /// [`FsError::DirectoryNotEmpty`].
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn delete(&self, path: &BucketPath) -> FsResult<()> {
        self.delete_inner(path)
            .inspect_err(|e| log_failure("delete", path, e))
    }

    fn delete_inner(&self, path: &BucketPath) -> FsResult<()> {
        let bucket = path.require_bucket()?;
        match self.resolver.resolve(path)? {
            Existence::Absent => {
                debug!(path = %path, "delete of absent path");
            }
            Existence::File(meta) => self.store.delete_object(bucket, &meta.key)?,
            Existence::Directory(DirectoryKind::BucketRoot) => {
                return Err(FsError::unsupported("bucket deletion"));
            }
            Existence::Directory(_) => {
                if self.resolver.has_children(path)? {
                    return Err(FsError::DirectoryNotEmpty {
                        path: path.with_directory(true).to_string(),
                    });
                }
                self.store
                    .delete_object(bucket, &path.with_directory(true).key())?;
            }
        }
        self.invalidate_lineage(path);
        Ok(())
    }

    /// Copies a single object.
    ///
    /// Copying a path onto itself does nothing. Directories cannot be
    /// copied. An existing target needs `replace_existing`.
    #[instrument(level = "debug", skip_all, fields(src = %src, dst = %dst))]
    pub fn copy(&self, src: &BucketPath, dst: &BucketPath, options: CopyOptions) -> FsResult<()> {
        self.copy_inner(src, dst, options)
            .inspect_err(|e| log_failure("copy", src, e))
    }

    fn copy_inner(&self, src: &BucketPath, dst: &BucketPath, options: CopyOptions) -> FsResult<()> {
        if self.is_same_file(src, dst) {
            return Ok(());
        }
        if options.atomic_move {
            return Err(FsError::unsupported("atomic copy"));
        }
        let src_bucket = src.require_bucket()?;
        let dst_bucket = dst.require_bucket()?;

        let src_meta = match self.resolver.resolve(src)? {
            Existence::Absent => return Err(FsError::not_found(src)),
            Existence::Directory(_) => {
                return Err(FsError::unsupported(format!("copying directory {src}")));
            }
            Existence::File(meta) => meta,
        };

        match self.resolver.resolve(dst)? {
            Existence::Directory(_) => {
                return Err(FsError::unsupported(format!("copying onto directory {dst}")));
            }
            Existence::File(_) if !options.replace_existing => {
                return Err(FsError::already_exists(dst));
            }
            _ if dst.is_directory() => {
                return Err(FsError::invalid_argument(format!(
                    "copy target {dst} is a directory path"
                )));
            }
            _ => {}
        }

        self.store
            .copy_object(src_bucket, &src_meta.key, dst_bucket, &dst.key())?;
        self.invalidate_lineage(dst);
        Ok(())
    }

    /// Copy then delete. The store has no rename, so `atomic_move` is
    /// refused outright.
    #[instrument(level = "debug", skip_all, fields(src = %src, dst = %dst))]
    pub fn move_path(
        &self,
        src: &BucketPath,
        dst: &BucketPath,
        options: CopyOptions,
    ) -> FsResult<()> {
        if options.atomic_move {
            return Err(FsError::unsupported("atomic move"));
        }
        if self.is_same_file(src, dst) {
            return Ok(());
        }
        self.copy(src, dst, options)?;
        self.delete(src)
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Replaces the whole object at `path` with `data`.
    #[instrument(level = "debug", skip_all, fields(path = %path, len = data.len()))]
    pub fn write_object(&self, path: &BucketPath, data: &[u8]) -> FsResult<()> {
        let bucket = path.require_bucket()?;
        if path.is_directory() {
            return Err(FsError::invalid_argument(format!(
                "cannot write to directory path {path}"
            )));
        }
        self.store
            .put_object(bucket, &path.key(), data)
            .map_err(FsError::from)
            .inspect_err(|e| log_failure("write_object", path, e))?;
        self.invalidate_lineage(path);
        Ok(())
    }

    /// Reads the whole object at `path`.
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn read_object(&self, path: &BucketPath) -> FsResult<Vec<u8>> {
        let bucket = path.require_bucket()?;
        if path.is_directory() {
            return Err(FsError::invalid_argument(format!(
                "cannot read directory path {path}"
            )));
        }
        self.store
            .get_object(bucket, &path.key())?
            .ok_or_else(|| FsError::not_found(path))
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Immediate children of the directory at `path`.
    ///
    /// Listed files warm the basic attribute cache.
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn list_directory(&self, path: &BucketPath) -> FsResult<DirectoryEntries<S>> {
        self.require_directory(path)?;
        Ok(DirectoryEntries::new(Arc::clone(&self.store), path)?
            .with_page_size(self.config.effective_page_size())
            .with_cache(Arc::clone(&self.cache)))
    }

    /// Every descendant of the directory at `path`.
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn walk(&self, path: &BucketPath) -> FsResult<Walk<S>> {
        self.require_directory(path)?;
        Ok(Walk::new(Arc::clone(&self.store), path)?
            .with_page_size(self.config.effective_page_size()))
    }

    fn require_directory(&self, path: &BucketPath) -> FsResult<()> {
        match self.resolver.resolve(path)? {
            Existence::Directory(_) => Ok(()),
            Existence::Absent => Err(FsError::not_found(path)),
            Existence::File(_) => Err(FsError::invalid_argument(format!(
                "not a directory: {path}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Grantee, MemoryStore, Owner};

    fn fs_with(keys: &[&str]) -> FileSystem<MemoryStore> {
        let store = Arc::new(MemoryStore::new().with_bucket("b", Owner::new("u1", "alice")));
        for key in keys {
            store.put_object("b", key, b"data").unwrap();
        }
        FileSystem::new(store, FsConfig::local().with_identity("u1"))
    }

    fn path(text: &str) -> BucketPath {
        BucketPath::parse(text).unwrap()
    }

    #[test]
    fn test_read_attributes_caches_stored_objects() {
        let fs = fs_with(&["f.txt"]);
        let p = path("/b/f.txt");
        assert_eq!(fs.read_attributes(&p, AttributeKind::Basic).unwrap().size, 4);
        fs.store().reset_calls();
        fs.read_attributes(&p, AttributeKind::Basic).unwrap();
        assert_eq!(fs.store().calls().metadata_reads(), 0);
    }

    #[test]
    fn test_read_attributes_absent_is_not_found() {
        let fs = fs_with(&[]);
        let err = fs
            .read_attributes(&path("/b/nope"), AttributeKind::Basic)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_basic_request_after_posix_returns_basic_view() {
        let fs = fs_with(&["f"]);
        let p = path("/b/f");
        let posix = fs.read_attributes(&p, AttributeKind::PosixExtended).unwrap();
        assert_eq!(posix.owner.as_deref(), Some("u1:alice"));
        let basic = fs.read_attributes(&p, AttributeKind::Basic).unwrap();
        assert_eq!(basic.kind, AttributeKind::Basic);
        assert!(basic.owner.is_none());
    }

    #[test]
    fn test_posix_request_after_basic_is_not_downgraded() {
        let fs = fs_with(&["f"]);
        let p = path("/b/f");
        let basic = fs.read_attributes(&p, AttributeKind::Basic).unwrap();
        assert!(!basic.satisfies(AttributeKind::PosixExtended));

        let posix = fs.read_attributes(&p, AttributeKind::PosixExtended).unwrap();
        assert_eq!(posix.kind, AttributeKind::PosixExtended);
        assert!(posix.satisfies(AttributeKind::Basic));
        assert_eq!(posix.to_basic(), basic);
    }

    #[test]
    fn test_write_invalidates_negative_parent() {
        let fs = fs_with(&[]);
        assert!(!fs.exists(&path("/b/new")).unwrap());
        fs.write_object(&path("/b/new/file"), b"x").unwrap();
        assert!(fs.is_directory(&path("/b/new")).unwrap());
    }

    #[test]
    fn test_access_modes_parse() {
        assert_eq!(
            AccessMode::parse_modes("rw").unwrap(),
            [AccessMode::Read, AccessMode::Write]
        );
        assert!(AccessMode::parse_modes("rq").is_err());
    }

    #[test]
    fn test_write_access_uses_bucket_acl() {
        let fs = fs_with(&["f"]);
        let p = path("/b/f");
        let public_read =
            Acl::private(Owner::new("u1", "alice")).with_grant(Grantee::AllUsers, AclPermission::Read);
        fs.store().set_object_acl("b", "f", public_read).unwrap();

        let guest = FileSystem::new(
            Arc::clone(fs.store()),
            FsConfig::local().with_identity("u2"),
        );
        guest.check_access(&p, &[AccessMode::Read]).unwrap();
        let err = guest.check_access(&p, &[AccessMode::Write]).unwrap_err();
        assert!(matches!(err, FsError::AccessDenied { .. }));
    }

    #[test]
    fn test_move_onto_itself_keeps_source() {
        let fs = fs_with(&["f"]);
        let p = path("/b/f");
        fs.move_path(&p, &p, CopyOptions::new()).unwrap();
        assert!(fs.exists(&p).unwrap());
    }

    #[test]
    fn test_unsupported_operations() {
        let fs = fs_with(&["f"]);
        let p = path("/b/f");
        assert!(matches!(
            fs.set_attribute(&p, "size", "1"),
            Err(FsError::Unsupported { .. })
        ));
        assert!(matches!(
            fs.create_symbolic_link(&path("/b/l"), &p),
            Err(FsError::Unsupported { .. })
        ));
        assert!(!fs.is_hidden(&p));
    }
}
