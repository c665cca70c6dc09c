//! The object store collaborator.
//!
//! [`ObjectStore`] is the minimal set of calls the filesystem layer makes
//! against a flat, key-based store. Network clients live outside this crate;
//! [`MemoryStore`] is a thread-safe in-memory implementation used by tests
//! and the CLI.

mod memory;

pub use memory::{CallCounts, MemoryStore, MemoryStoreSnapshot};

use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page a store returns from one listing call.
pub const MAX_LIST_PAGE: usize = 1000;

/// Failures reported by the store collaborator.
///
/// These are always propagated to the caller and never cached. An absent
/// object is not an error: `head_object` answers `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no such bucket: {bucket}")]
    NoSuchBucket { bucket: String },

    /// Raised by calls that require the object (ACL reads, copy source).
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// Transport or service failure.
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A bucket as reported by [`ObjectStore::list_buckets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: SystemTime,
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: SystemTime,
}

/// One page of a prefix listing, in lexicographic key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<ObjectMeta>,
    /// More keys follow this page.
    pub truncated: bool,
    /// Pass as `marker` to fetch the next page. Set when `truncated`.
    pub next_marker: Option<String>,
}

/// Owner of a bucket or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

impl Owner {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Owner {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Principal name in `"<id>:<display name>"` form.
    pub fn principal(&self) -> String {
        format!("{}:{}", self.id, self.display_name)
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grantee {
    CanonicalUser(String),
    /// Anyone, including anonymous callers.
    AllUsers,
    /// Any caller presenting credentials.
    AuthenticatedUsers,
}

impl Grantee {
    fn matches(&self, identity: Option<&str>) -> bool {
        match self {
            Self::CanonicalUser(id) => identity == Some(id.as_str()),
            Self::AllUsers => true,
            Self::AuthenticatedUsers => identity.is_some(),
        }
    }
}

/// ACL permission as stored by the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPermission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: AclPermission,
}

/// Access control list of a bucket or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub owner: Owner,
    pub grants: Vec<Grant>,
}

impl Acl {
    /// ACL granting `FULL_CONTROL` to `owner` only.
    pub fn private(owner: Owner) -> Self {
        let grantee = Grantee::CanonicalUser(owner.id.clone());
        Acl {
            owner,
            grants: vec![Grant {
                grantee,
                permission: AclPermission::FullControl,
            }],
        }
    }

    /// Adds a grant.
    #[must_use]
    pub fn with_grant(mut self, grantee: Grantee, permission: AclPermission) -> Self {
        self.grants.push(Grant {
            grantee,
            permission,
        });
        self
    }

    /// True if any grant matching `identity` carries one of `wanted`.
    pub fn allows(&self, identity: Option<&str>, wanted: &[AclPermission]) -> bool {
        self.grants
            .iter()
            .any(|g| g.grantee.matches(identity) && wanted.contains(&g.permission))
    }
}

/// Calls the filesystem layer makes against an object store.
///
/// Implementations must be safe to call from many threads at once. Every
/// call may block on network I/O.
pub trait ObjectStore: Send + Sync {
    /// Every bucket visible to the caller, ordered by name.
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>>;

    /// Whether `bucket` exists.
    fn head_bucket(&self, bucket: &str) -> StoreResult<bool>;

    /// Metadata for the exact `key`, `None` if absent.
    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectMeta>>;

    /// Keys starting with `prefix` and strictly greater than `marker`, at
    /// most `limit` (clamped to [`MAX_LIST_PAGE`]).
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StoreResult<ListPage>;

    fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<Acl>;

    fn get_bucket_acl(&self, bucket: &str) -> StoreResult<Acl>;

    /// Whole-object read, `None` if absent.
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> StoreResult<()>;

    /// Idempotent: deleting an absent key succeeds.
    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>> {
        (**self).list_buckets()
    }

    fn head_bucket(&self, bucket: &str) -> StoreResult<bool> {
        (**self).head_bucket(bucket)
    }

    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectMeta>> {
        (**self).head_object(bucket, key)
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StoreResult<ListPage> {
        (**self).list_objects(bucket, prefix, marker, limit)
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<Acl> {
        (**self).get_object_acl(bucket, key)
    }

    fn get_bucket_acl(&self, bucket: &str) -> StoreResult<Acl> {
        (**self).get_bucket_acl(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> StoreResult<()> {
        (**self).put_object(bucket, key, data)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        (**self).delete_object(bucket, key)
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        (**self).copy_object(src_bucket, src_key, dst_bucket, dst_key)
    }
}
