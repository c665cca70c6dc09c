//! Ordered listings over paginated prefix queries.
//!
//! The store answers listings in bounded pages. [`ObjectListing`] chains the
//! pages by marker into one lazy, ordered sequence; [`DirectoryEntries`] and
//! [`Walk`] turn the flat key space into hierarchical views on top of it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::attributes::AttributeSnapshot;
use crate::cache::AttributesCache;
use crate::error::FsResult;
use crate::path::{BucketPath, SEPARATOR};
use crate::store::{MAX_LIST_PAGE, ObjectMeta, ObjectStore};

/// Every key under a prefix, in lexicographic order.
///
/// Pages are fetched on demand. After an error the iterator is exhausted;
/// [`restart`](Self::restart) begins again from the first page.
pub struct ObjectListing<S> {
    store: Arc<S>,
    bucket: String,
    prefix: String,
    page_size: usize,
    marker: Option<String>,
    buffer: VecDeque<ObjectMeta>,
    exhausted: bool,
    pages: u64,
}

impl<S: ObjectStore> ObjectListing<S> {
    pub fn new(store: Arc<S>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
            page_size: MAX_LIST_PAGE,
            marker: None,
            buffer: VecDeque::new(),
            exhausted: false,
            pages: 0,
        }
    }

    /// Keys requested per store call, clamped to `1..=MAX_LIST_PAGE`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_PAGE);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> u64 {
        self.pages
    }

    /// Starts over from the first page.
    pub fn restart(&mut self) {
        self.marker = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fetch_page(&mut self) -> FsResult<()> {
        let page = self.store.list_objects(
            &self.bucket,
            &self.prefix,
            self.marker.as_deref(),
            self.page_size,
        )?;
        self.pages += 1;
        debug!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            entries = page.entries.len(),
            truncated = page.truncated,
            "fetched listing page"
        );
        self.marker = match (page.truncated, page.next_marker) {
            (true, Some(marker)) => Some(marker),
            // Stores that omit the marker continue after the last key
            (true, None) => page.entries.last().map(|e| e.key.clone()),
            (false, _) => None,
        };
        self.exhausted = self.marker.is_none();
        self.buffer.extend(page.entries);
        Ok(())
    }
}

impl<S: ObjectStore> Iterator for ObjectListing<S> {
    type Item = FsResult<ObjectMeta>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(meta) = self.buffer.pop_front() {
                return Some(Ok(meta));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

/// A listed path with the metadata the listing carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: BucketPath,
    /// Set for stored objects, `None` for directories implied by deeper keys.
    pub meta: Option<ObjectMeta>,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.path.is_directory()
    }
}

type EntryFilter = Box<dyn Fn(&BucketPath) -> bool + Send>;

/// Immediate children of a directory.
///
/// Files come back as non-directory paths; deeper keys collapse to one
/// directory path per child name. The directory's own marker is skipped.
pub struct DirectoryEntries<S> {
    dir: BucketPath,
    prefix: String,
    listing: ObjectListing<S>,
    last_dir: Option<String>,
    filter: Option<EntryFilter>,
    cache: Option<Arc<AttributesCache>>,
}

impl<S: ObjectStore> DirectoryEntries<S> {
    /// Lists the children of `dir`, which must be absolute.
    pub fn new(store: Arc<S>, dir: &BucketPath) -> FsResult<Self> {
        let bucket = dir.require_bucket()?.to_owned();
        let dir = dir.with_directory(true);
        let prefix = dir.key();
        Ok(Self {
            listing: ObjectListing::new(store, bucket, prefix.clone()),
            dir,
            prefix,
            last_dir: None,
            filter: None,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.listing = self.listing.with_page_size(page_size);
        self
    }

    /// Only yield entries accepted by `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Fn(&BucketPath) -> bool + Send + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Record basic attributes of listed files in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<AttributesCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Starts over from the first page.
    pub fn restart(&mut self) {
        self.listing.restart();
        self.last_dir = None;
    }

    fn entry_for(&mut self, meta: ObjectMeta) -> Option<DirEntry> {
        let rest = meta.key.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            return None;
        }
        match rest.split_once(SEPARATOR) {
            Some((child, _)) => {
                if self.last_dir.as_deref() == Some(child) {
                    return None;
                }
                self.last_dir = Some(child.to_owned());
                Some(DirEntry {
                    path: self.dir.resolve(&BucketPath::from_parts(
                        None,
                        vec![child.to_owned()],
                        true,
                    )),
                    meta: None,
                })
            }
            None => {
                let path = self.dir.resolve(&BucketPath::from_parts(
                    None,
                    vec![rest.to_owned()],
                    false,
                ));
                if let Some(cache) = &self.cache {
                    cache.refresh_basic(&path, &AttributeSnapshot::file(&meta));
                }
                Some(DirEntry {
                    path,
                    meta: Some(meta),
                })
            }
        }
    }
}

impl<S: ObjectStore> Iterator for DirectoryEntries<S> {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let meta = match self.listing.next()? {
                Ok(meta) => meta,
                Err(e) => return Some(Err(e)),
            };
            let Some(entry) = self.entry_for(meta) else {
                continue;
            };
            if self.filter.as_ref().is_none_or(|f| f(&entry.path)) {
                return Some(Ok(entry));
            }
        }
    }
}

/// Every descendant of a directory, including directories implied by
/// deeper keys, each yielded once before its contents.
pub struct Walk<S> {
    dir: BucketPath,
    prefix: String,
    listing: ObjectListing<S>,
    seen_dirs: HashSet<String>,
    pending: VecDeque<DirEntry>,
}

impl<S: ObjectStore> Walk<S> {
    pub fn new(store: Arc<S>, dir: &BucketPath) -> FsResult<Self> {
        let bucket = dir.require_bucket()?.to_owned();
        let dir = dir.with_directory(true);
        let prefix = dir.key();
        Ok(Self {
            listing: ObjectListing::new(store, bucket, prefix.clone()),
            dir,
            prefix,
            seen_dirs: HashSet::new(),
            pending: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.listing = self.listing.with_page_size(page_size);
        self
    }

    fn expand(&mut self, meta: ObjectMeta) {
        let Some(rest) = meta.key.strip_prefix(&self.prefix) else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        let rest = rest.to_owned();
        let names: Vec<&str> = rest.split(SEPARATOR).collect();
        let (last, dirs) = match names.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut segments: Vec<String> = Vec::with_capacity(names.len());
        for name in dirs {
            segments.push((*name).to_owned());
            let dir_key = segments.join("/");
            if self.seen_dirs.insert(dir_key) {
                self.pending.push_back(DirEntry {
                    path: self
                        .dir
                        .resolve(&BucketPath::from_parts(None, segments.clone(), true)),
                    meta: None,
                });
            }
        }

        // A key ending in '/' is a marker for the directory just emitted
        if !last.is_empty() {
            segments.push((*last).to_owned());
            self.pending.push_back(DirEntry {
                path: self
                    .dir
                    .resolve(&BucketPath::from_parts(None, segments, false)),
                meta: Some(meta),
            });
        }
    }
}

impl<S: ObjectStore> Iterator for Walk<S> {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            match self.listing.next()? {
                Ok(meta) => self.expand(meta),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
