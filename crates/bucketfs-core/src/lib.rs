//! A filesystem view over S3-style object stores.
//!
//! Object stores have buckets and flat keys, nothing else. This crate layers
//! hierarchical paths, directories and file attributes on top of them.
//!
//! # Components
//!
//! - [`BucketPath`] - Path algebra over `/bucket/key` with an explicit
//!   directory flag
//! - [`AttributesCache`] - TTL-bounded cache of attribute snapshots with
//!   negative entries
//! - [`VirtualDirectoryResolver`] - Decides whether a path is a file, a
//!   directory (explicit or implicit) or absent
//! - [`FileSystem`] - Create, delete, copy, move, access checks, attribute
//!   reads and listings
//! - [`FileStore`] - A bucket seen as a file store, with its owner and
//!   root directory
//! - [`FileSystemRegistry`] - One open filesystem per connection identity
//! - [`store::ObjectStore`] - The calls made against the store, with an
//!   in-memory implementation in [`store::MemoryStore`]
//!
//! # Directories
//!
//! A directory exists if an explicit marker object (`dir/`) is stored, or if
//! any key lives beneath it. The second kind is implicit: it has no object
//! of its own, so its attributes are synthesized and never cached.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bucketfs_core::{AttributeKind, BucketPath, FileSystem, FsConfig};
//! use bucketfs_core::store::{MemoryStore, Owner};
//!
//! let store = Arc::new(MemoryStore::new().with_bucket("photos", Owner::new("u1", "alice")));
//! let fs = FileSystem::new(store, FsConfig::local());
//!
//! let file = BucketPath::parse("/photos/2024/beach.jpg")?;
//! fs.write_object(&file, b"jpeg")?;
//!
//! let year = BucketPath::parse("/photos/2024")?;
//! assert!(fs.is_directory(&year)?);
//! assert_eq!(fs.read_attributes(&file, AttributeKind::Basic)?.size, 4);
//! # Ok::<(), bucketfs_core::FsError>(())
//! ```

pub mod attributes;
pub mod cache;
pub mod config;
pub mod error;
pub mod file_store;
pub mod listing;
pub mod ops;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod stats;
pub mod store;

pub use attributes::{AttributeKind, AttributeSnapshot, AttributeValue, PosixPermission};
pub use cache::{AttributeFetcher, AttributesCache, Fetched};
pub use config::FsConfig;
pub use error::{ErrorCategory, FsError, FsResult};
pub use file_store::FileStore;
pub use listing::{DirEntry, DirectoryEntries, ObjectListing, Walk};
pub use ops::{AccessMode, CopyOptions, FileSystem};
pub use path::BucketPath;
pub use registry::{ConnectionId, FileSystemRegistry};
pub use resolver::{Existence, PathState, VirtualDirectoryResolver};
pub use stats::{CacheStats, CacheStatsSnapshot};
