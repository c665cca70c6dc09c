//! Shared harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bucketfs_core::store::{MemoryStore, ObjectStore, Owner};
use bucketfs_core::{BucketPath, FileSystem, FsConfig};

pub const BUCKET: &str = "bucket";
pub const OWNER_ID: &str = "owner-id";

pub fn owner() -> Owner {
    Owner::new(OWNER_ID, "owner")
}

/// A store with one bucket holding `keys`, each with a short payload.
pub fn seeded_store(keys: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new().with_bucket(BUCKET, owner()));
    for key in keys {
        store
            .put_object(BUCKET, key, key.as_bytes())
            .expect("seed object");
    }
    store.reset_calls();
    store
}

/// A filesystem over `seeded_store(keys)`, acting as the bucket owner.
pub fn seeded_fs(keys: &[&str]) -> FileSystem<MemoryStore> {
    FileSystem::new(
        seeded_store(keys),
        FsConfig::local().with_identity(OWNER_ID),
    )
}

pub fn path(text: &str) -> BucketPath {
    BucketPath::parse(text).expect("valid path")
}

/// Absolute path inside the test bucket.
pub fn bpath(key: &str) -> BucketPath {
    path(&format!("/{BUCKET}/{key}"))
}

/// Installs a subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
