//! In-memory [`ObjectStore`].

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{
    Acl, BucketInfo, ListPage, MAX_LIST_PAGE, ObjectMeta, ObjectStore, Owner, StoreError,
    StoreResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: SystemTime,
    acl: Acl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Bucket {
    acl: Acl,
    #[serde(default = "SystemTime::now")]
    created: SystemTime,
    objects: BTreeMap<String, StoredObject>,
}

/// Serializable copy of a [`MemoryStore`]'s contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreSnapshot {
    buckets: BTreeMap<String, Bucket>,
}

/// Number of calls made per store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_buckets: u64,
    pub head_bucket: u64,
    pub head_object: u64,
    pub list_objects: u64,
    pub get_object_acl: u64,
    pub get_bucket_acl: u64,
    pub get_object: u64,
    pub put_object: u64,
    pub delete_object: u64,
    pub copy_object: u64,
}

impl CallCounts {
    /// Calls that only read metadata.
    pub fn metadata_reads(&self) -> u64 {
        self.list_buckets
            + self.head_bucket
            + self.head_object
            + self.list_objects
            + self.get_object_acl
            + self.get_bucket_acl
    }
}

#[derive(Debug, Default)]
struct Counters {
    list_buckets: AtomicU64,
    head_bucket: AtomicU64,
    head_object: AtomicU64,
    list_objects: AtomicU64,
    get_object_acl: AtomicU64,
    get_bucket_acl: AtomicU64,
    get_object: AtomicU64,
    put_object: AtomicU64,
    delete_object: AtomicU64,
    copy_object: AtomicU64,
}

/// Thread-safe in-memory object store.
///
/// Keys are kept in a `BTreeMap` per bucket, so listings come back in
/// lexicographic order and pagination by marker is exact. Every call is
/// counted, which lets tests assert how often the store was consulted.
///
/// # Example
///
/// ```
/// use bucketfs_core::store::{MemoryStore, ObjectStore, Owner};
///
/// let store = MemoryStore::new().with_bucket("photos", Owner::new("u1", "alice"));
/// store.put_object("photos", "2024/beach.jpg", b"...")?;
///
/// let page = store.list_objects("photos", "2024/", None, 10)?;
/// assert_eq!(page.entries.len(), 1);
/// assert_eq!(store.calls().put_object, 1);
/// # Ok::<(), bucketfs_core::store::StoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    counters: Counters,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a store from a snapshot.
    pub fn from_snapshot(snapshot: MemoryStoreSnapshot) -> Self {
        MemoryStore {
            buckets: RwLock::new(snapshot.buckets),
            ..Self::default()
        }
    }

    /// Copies the current contents.
    pub fn snapshot(&self) -> MemoryStoreSnapshot {
        MemoryStoreSnapshot {
            buckets: self.buckets.read().clone(),
        }
    }

    /// Builder form of [`create_bucket`](Self::create_bucket), for seeding
    /// fixtures.
    ///
    /// # Panics
    ///
    /// Panics if `name` was already seeded.
    #[must_use]
    pub fn with_bucket(self, name: &str, owner: Owner) -> Self {
        if let Err(e) = self.create_bucket(name, owner) {
            panic!("cannot seed bucket {name:?}: {e}");
        }
        self
    }

    /// Creates an empty bucket whose ACL grants the owner full control.
    pub fn create_bucket(&self, name: &str, owner: Owner) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        if buckets.contains_key(name) {
            return Err(StoreError::Backend(format!("bucket already exists: {name}")));
        }
        buckets.insert(
            name.to_owned(),
            Bucket {
                acl: Acl::private(owner),
                created: SystemTime::now(),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn set_bucket_acl(&self, bucket: &str, acl: Acl) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        let b = buckets.get_mut(bucket).ok_or_else(|| no_bucket(bucket))?;
        b.acl = acl;
        Ok(())
    }

    pub fn set_object_acl(&self, bucket: &str, key: &str, acl: Acl) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        let b = buckets.get_mut(bucket).ok_or_else(|| no_bucket(bucket))?;
        let object = b.objects.get_mut(key).ok_or_else(|| no_key(bucket, key))?;
        object.acl = acl;
        Ok(())
    }

    /// All keys in `bucket`, in order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Makes every call fail with [`StoreError::Backend`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Call counts since creation or the last [`reset_calls`](Self::reset_calls).
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            list_buckets: c.list_buckets.load(Ordering::Relaxed),
            head_bucket: c.head_bucket.load(Ordering::Relaxed),
            head_object: c.head_object.load(Ordering::Relaxed),
            list_objects: c.list_objects.load(Ordering::Relaxed),
            get_object_acl: c.get_object_acl.load(Ordering::Relaxed),
            get_bucket_acl: c.get_bucket_acl.load(Ordering::Relaxed),
            get_object: c.get_object.load(Ordering::Relaxed),
            put_object: c.put_object.load(Ordering::Relaxed),
            delete_object: c.delete_object.load(Ordering::Relaxed),
            copy_object: c.copy_object.load(Ordering::Relaxed),
        }
    }

    pub fn reset_calls(&self) {
        let c = &self.counters;
        for counter in [
            &c.list_buckets,
            &c.head_bucket,
            &c.head_object,
            &c.list_objects,
            &c.get_object_acl,
            &c.get_bucket_acl,
            &c.get_object,
            &c.put_object,
            &c.delete_object,
            &c.copy_object,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn enter(&self, counter: &AtomicU64, op: &'static str) -> StoreResult<()> {
        counter.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("{op}: store unavailable")));
        }
        Ok(())
    }
}

fn no_bucket(bucket: &str) -> StoreError {
    StoreError::NoSuchBucket {
        bucket: bucket.to_owned(),
    }
}

fn no_key(bucket: &str, key: &str) -> StoreError {
    StoreError::NoSuchKey {
        bucket: bucket.to_owned(),
        key: key.to_owned(),
    }
}

fn meta(key: &str, object: &StoredObject) -> ObjectMeta {
    ObjectMeta {
        key: key.to_owned(),
        size: object.data.len() as u64,
        last_modified: object.last_modified,
    }
}

impl ObjectStore for MemoryStore {
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>> {
        self.enter(&self.counters.list_buckets, "list_buckets")?;
        Ok(self
            .buckets
            .read()
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                creation_date: b.created,
            })
            .collect())
    }

    fn head_bucket(&self, bucket: &str) -> StoreResult<bool> {
        self.enter(&self.counters.head_bucket, "head_bucket")?;
        Ok(self.buckets.read().contains_key(bucket))
    }

    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectMeta>> {
        self.enter(&self.counters.head_object, "head_object")?;
        trace!(bucket, key, "head_object");
        let buckets = self.buckets.read();
        let b = buckets.get(bucket).ok_or_else(|| no_bucket(bucket))?;
        Ok(b.objects.get(key).map(|o| meta(key, o)))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StoreResult<ListPage> {
        self.enter(&self.counters.list_objects, "list_objects")?;
        trace!(bucket, prefix, ?marker, limit, "list_objects");
        let limit = limit.clamp(1, MAX_LIST_PAGE);
        let buckets = self.buckets.read();
        let b = buckets.get(bucket).ok_or_else(|| no_bucket(bucket))?;

        let start = match marker {
            Some(m) if m >= prefix => Bound::Excluded(m),
            _ => Bound::Included(prefix),
        };
        let mut matching = b
            .objects
            .range::<str, _>((start, Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));

        let entries: Vec<ObjectMeta> = matching
            .by_ref()
            .take(limit)
            .map(|(k, o)| meta(k, o))
            .collect();
        let truncated = matching.next().is_some();
        let next_marker = if truncated {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };
        Ok(ListPage {
            entries,
            truncated,
            next_marker,
        })
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<Acl> {
        self.enter(&self.counters.get_object_acl, "get_object_acl")?;
        let buckets = self.buckets.read();
        let b = buckets.get(bucket).ok_or_else(|| no_bucket(bucket))?;
        b.objects
            .get(key)
            .map(|o| o.acl.clone())
            .ok_or_else(|| no_key(bucket, key))
    }

    fn get_bucket_acl(&self, bucket: &str) -> StoreResult<Acl> {
        self.enter(&self.counters.get_bucket_acl, "get_bucket_acl")?;
        let buckets = self.buckets.read();
        buckets
            .get(bucket)
            .map(|b| b.acl.clone())
            .ok_or_else(|| no_bucket(bucket))
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.enter(&self.counters.get_object, "get_object")?;
        let buckets = self.buckets.read();
        let b = buckets.get(bucket).ok_or_else(|| no_bucket(bucket))?;
        Ok(b.objects.get(key).map(|o| o.data.clone()))
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> StoreResult<()> {
        self.enter(&self.counters.put_object, "put_object")?;
        trace!(bucket, key, len = data.len(), "put_object");
        let mut buckets = self.buckets.write();
        let b = buckets.get_mut(bucket).ok_or_else(|| no_bucket(bucket))?;
        let acl = Acl::private(b.acl.owner.clone());
        b.objects.insert(
            key.to_owned(),
            StoredObject {
                data: data.to_vec(),
                last_modified: SystemTime::now(),
                acl,
            },
        );
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.enter(&self.counters.delete_object, "delete_object")?;
        trace!(bucket, key, "delete_object");
        let mut buckets = self.buckets.write();
        let b = buckets.get_mut(bucket).ok_or_else(|| no_bucket(bucket))?;
        b.objects.remove(key);
        Ok(())
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        self.enter(&self.counters.copy_object, "copy_object")?;
        trace!(src_bucket, src_key, dst_bucket, dst_key, "copy_object");
        let mut buckets = self.buckets.write();
        let source = buckets
            .get(src_bucket)
            .ok_or_else(|| no_bucket(src_bucket))?
            .objects
            .get(src_key)
            .ok_or_else(|| no_key(src_bucket, src_key))?
            .data
            .clone();
        let dst = buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| no_bucket(dst_bucket))?;
        let acl = Acl::private(dst.acl.owner.clone());
        dst.objects.insert(
            dst_key.to_owned(),
            StoredObject {
                data: source,
                last_modified: SystemTime::now(),
                acl,
            },
        );
        Ok(())
    }
}
