//! Hierarchical paths over a bucket-scoped key namespace.
//!
//! A [`BucketPath`] is either absolute (`/bucket/a/b`) or relative (`a/b`).
//! The first segment of an absolute path names the bucket; the remaining
//! segments joined by `/` form the object key. Object stores have no
//! directories, so whether a path denotes a directory is carried as an
//! explicit flag, set from a trailing separator at parse time:
//!
//! - `/bucket/dir/` is a directory, its key is `dir/`
//! - `/bucket/dir` is not, its key is `dir`
//! - `/bucket` and `/bucket/` are the bucket root, always a directory, key `""`
//!
//! Two paths that differ only by the trailing separator are **not** equal.
//! All operations here are pure; nothing touches the store.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{FsError, FsResult};

/// Path separator used by every object store key.
pub const SEPARATOR: char = '/';

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";

/// Immutable path value addressing an object (or virtual directory) in a bucket.
///
/// # Examples
///
/// ```
/// use bucketfs_core::path::BucketPath;
///
/// let dir = BucketPath::parse("/bucket/path/to/dir/")?;
/// let child = dir.resolve(&BucketPath::parse("child/xyz")?);
/// assert_eq!(child.to_string(), "/bucket/path/to/dir/child/xyz");
/// assert_eq!(child.key(), "path/to/dir/child/xyz");
/// assert_eq!(child.bucket(), Some("bucket"));
///
/// // Trailing separators are significant
/// assert_ne!(BucketPath::parse("/b/dir")?, BucketPath::parse("/b/dir/")?);
/// # Ok::<(), bucketfs_core::FsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketPath {
    bucket: Option<String>,
    segments: Vec<String>,
    is_directory: bool,
}

impl BucketPath {
    /// Builds a path from parts. Paths without segments (bucket root, empty
    /// relative path) are always directories.
    pub(crate) fn from_parts(
        bucket: Option<String>,
        segments: Vec<String>,
        is_directory: bool,
    ) -> Self {
        let is_directory = is_directory || segments.is_empty();
        BucketPath {
            bucket,
            segments,
            is_directory,
        }
    }

    /// Parses path text.
    ///
    /// A leading `/` makes the path absolute and its first segment the
    /// bucket. Consecutive separators collapse. The path is a directory if
    /// the text ends with `/` or has no segments beyond the bucket.
    ///
    /// Fails with [`FsError::InvalidArgument`] for an absolute path without a
    /// bucket (`/`) or one starting with `//`.
    pub fn parse(text: &str) -> FsResult<Self> {
        let absolute = text.starts_with(SEPARATOR);
        if absolute && text[1..].starts_with(SEPARATOR) {
            return Err(FsError::invalid_argument(format!(
                "path must not start with '//', missing bucket: {text:?}"
            )));
        }

        let mut parts = text
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let bucket = if absolute {
            match parts.next() {
                Some(bucket) => Some(bucket),
                None => {
                    return Err(FsError::invalid_argument(format!(
                        "absolute path must start with a bucket name: {text:?}"
                    )));
                }
            }
        } else {
            None
        };

        let segments: Vec<String> = parts.collect();
        let is_directory = text.ends_with(SEPARATOR);
        Ok(Self::from_parts(bucket, segments, is_directory))
    }

    /// The root of `bucket`.
    pub fn bucket_root(bucket: impl Into<String>) -> Self {
        Self::from_parts(Some(bucket.into()), Vec::new(), true)
    }

    /// The empty relative path (`""`).
    pub fn empty() -> Self {
        Self::from_parts(None, Vec::new(), true)
    }

    /// Bucket name, `None` for relative paths.
    #[inline]
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Key segments after the bucket.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.bucket.is_some()
    }

    /// True if this path denotes a directory.
    #[inline]
    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// True for `/bucket/`.
    #[inline]
    pub fn is_bucket_root(&self) -> bool {
        self.is_absolute() && self.segments.is_empty()
    }

    /// True for the empty relative path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_absolute() && self.segments.is_empty()
    }

    /// Object store key for this path.
    ///
    /// Directories get a trailing separator, the bucket root yields `""`.
    pub fn key(&self) -> String {
        let mut key = self.segments.join("/");
        if self.is_directory && !self.segments.is_empty() {
            key.push(SEPARATOR);
        }
        key
    }

    /// Same bucket and segments, with the directory flag replaced.
    ///
    /// `/b/dir` becomes `/b/dir/` and vice versa. Paths without segments
    /// stay directories.
    #[must_use]
    pub fn with_directory(&self, is_directory: bool) -> Self {
        Self::from_parts(self.bucket.clone(), self.segments.clone(), is_directory)
    }

    /// The other spelling of this path: `dir` for `dir/` and `dir/` for `dir`.
    ///
    /// Returns `None` when there is no other spelling (no segments).
    pub fn slash_toggled(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.with_directory(!self.is_directory))
        }
    }

    /// Parent directory, `None` for the bucket root and the empty path.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self::from_parts(self.bucket.clone(), init.to_vec(), true))
    }

    /// Last segment as a relative path, carrying this path's directory flag.
    pub fn file_name(&self) -> Option<Self> {
        let last = self.segments.last()?;
        Some(Self::from_parts(None, vec![last.clone()], self.is_directory))
    }

    /// Number of key segments (the bucket is not counted).
    #[inline]
    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// Segment `index` as a single-segment relative path.
    pub fn get_name(&self, index: usize) -> FsResult<Self> {
        let Some(name) = self.segments.get(index) else {
            return Err(FsError::invalid_argument(format!(
                "name index {index} out of range for {self} ({} names)",
                self.segments.len()
            )));
        };
        let is_last = index + 1 == self.segments.len();
        Ok(Self::from_parts(
            None,
            vec![name.clone()],
            !is_last || self.is_directory,
        ))
    }

    /// Segments `begin..end`.
    ///
    /// A subpath starting at index 0 of an absolute path keeps the bucket.
    /// The result is a directory unless it ends at this path's last segment,
    /// in which case it inherits this path's flag.
    pub fn subpath(&self, begin: usize, end: usize) -> FsResult<Self> {
        if begin > end || end > self.segments.len() {
            return Err(FsError::invalid_argument(format!(
                "subpath range {begin}..{end} out of range for {self} ({} names)",
                self.segments.len()
            )));
        }
        let bucket = if begin == 0 { self.bucket.clone() } else { None };
        let is_directory = end < self.segments.len() || self.is_directory;
        Ok(Self::from_parts(
            bucket,
            self.segments[begin..end].to_vec(),
            is_directory,
        ))
    }

    /// Resolves `other` against this path.
    ///
    /// An absolute `other` wins outright; an empty `other` returns this path.
    #[must_use]
    pub fn resolve(&self, other: &BucketPath) -> Self {
        if other.is_absolute() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        Self::from_parts(self.bucket.clone(), segments, other.is_directory)
    }

    /// Parses `other` and resolves it against this path.
    pub fn join(&self, other: &str) -> FsResult<Self> {
        Ok(self.resolve(&BucketPath::parse(other)?))
    }

    /// Resolves `other` against the parent of this path.
    ///
    /// Without a parent, `other` is returned as-is.
    #[must_use]
    pub fn resolve_sibling(&self, other: &BucketPath) -> Self {
        match self.parent() {
            Some(parent) => parent.resolve(other),
            None => other.clone(),
        }
    }

    /// Relative path leading from this path to `other`.
    ///
    /// Both paths must be in the same bucket. Only descendants are
    /// supported: the result is `other`'s segments past the common prefix,
    /// there is no ascent through `..`.
    ///
    /// The empty path carries no directory flag of its own, so when the two
    /// paths differ only in their trailing separator (`/b/a` and `/b/a/`)
    /// the result is empty and resolving it gives back `self`, not `other`.
    /// This is the one case where `resolve` does not invert `relativize`.
    pub fn relativize(&self, other: &BucketPath) -> FsResult<Self> {
        if self.bucket != other.bucket {
            return Err(FsError::invalid_argument(format!(
                "cannot relativize paths in different buckets: {self}, {other}"
            )));
        }
        if self == other {
            return Ok(Self::empty());
        }
        let common = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();
        Ok(Self::from_parts(
            None,
            other.segments[common..].to_vec(),
            other.is_directory,
        ))
    }

    /// Removes `.` segments and folds `..` into the preceding segment.
    ///
    /// Absolute paths never ascend past the bucket root: `/bucket/..` is
    /// `/bucket/`. A relative path whose `..` has nothing left to fold is
    /// returned unchanged, as the same instance.
    pub fn normalize(&self) -> Cow<'_, BucketPath> {
        if !self
            .segments
            .iter()
            .any(|s| s == CURRENT_DIR || s == PARENT_DIR)
        {
            return Cow::Borrowed(self);
        }

        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_str() {
                CURRENT_DIR => {}
                PARENT_DIR => {
                    if out.pop().is_none() && !self.is_absolute() {
                        return Cow::Borrowed(self);
                    }
                }
                _ => out.push(segment.clone()),
            }
        }

        let ends_in_dot = self
            .segments
            .last()
            .is_some_and(|s| s == CURRENT_DIR || s == PARENT_DIR);
        Cow::Owned(Self::from_parts(
            self.bucket.clone(),
            out,
            self.is_directory || ends_in_dot,
        ))
    }

    /// Iterates segments as single-segment relative paths.
    ///
    /// Every element is a directory except the last one of a non-directory
    /// path. Calling `iter` again restarts from the first segment.
    pub fn iter(&self) -> Names<'_> {
        Names {
            path: self,
            index: 0,
        }
    }

    /// Segment-wise prefix test.
    ///
    /// An absolute candidate must be in the same bucket; an absolute path
    /// never starts with a relative one. The empty path only prefixes itself.
    pub fn starts_with(&self, other: &BucketPath) -> bool {
        if other.name_count() > self.name_count() {
            return false;
        }
        match (&self.bucket, &other.bucket) {
            (Some(_), None) | (None, Some(_)) => return false,
            (Some(a), Some(b)) if a != b => return false,
            _ => {}
        }
        if other.is_empty() && !self.is_empty() {
            return false;
        }
        self.segments
            .iter()
            .zip(&other.segments)
            .all(|(a, b)| a == b)
    }

    /// Segment-wise suffix test.
    ///
    /// An absolute candidate must be in the same bucket. A candidate with no
    /// segments only matches a path with no segments.
    pub fn ends_with(&self, other: &BucketPath) -> bool {
        if other.name_count() > self.name_count() {
            return false;
        }
        if other.name_count() == 0 && self.name_count() != 0 {
            return false;
        }
        if other.is_absolute() && other.bucket != self.bucket {
            return false;
        }
        self.segments
            .iter()
            .rev()
            .zip(other.segments.iter().rev())
            .all(|(a, b)| a == b)
    }

    /// Parses `other` and tests it as a prefix.
    pub fn starts_with_str(&self, other: &str) -> FsResult<bool> {
        Ok(self.starts_with(&BucketPath::parse(other)?))
    }

    /// Parses `other` and tests it as a suffix.
    pub fn ends_with_str(&self, other: &str) -> FsResult<bool> {
        Ok(self.ends_with(&BucketPath::parse(other)?))
    }

    /// Requires an absolute path, returning its bucket.
    pub(crate) fn require_bucket(&self) -> FsResult<&str> {
        self.bucket().ok_or_else(|| {
            FsError::invalid_argument(format!("path must be absolute: {self:?}"))
        })
    }
}

impl fmt::Display for BucketPath {
    /// Serialized form `[/bucket/]segments[/]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bucket) = &self.bucket {
            write!(f, "/{bucket}/")?;
        }
        f.write_str(&self.key())
    }
}

impl PartialOrd for BucketPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BucketPath {
    /// Lexicographic over the serialized form.
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl FromStr for BucketPath {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BucketPath::parse(s)
    }
}

impl<'a> IntoIterator for &'a BucketPath {
    type Item = BucketPath;
    type IntoIter = Names<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the names of a [`BucketPath`].
#[derive(Debug, Clone)]
pub struct Names<'a> {
    path: &'a BucketPath,
    index: usize,
}

impl Iterator for Names<'_> {
    type Item = BucketPath;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.path.segments.get(self.index)?;
        self.index += 1;
        let is_last = self.index == self.path.segments.len();
        Some(BucketPath::from_parts(
            None,
            vec![segment.clone()],
            !is_last || self.path.is_directory,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.path.segments.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Names<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> BucketPath {
        BucketPath::parse(text).unwrap()
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_absolute() {
        let path = p("/bucket/a/b");
        assert_eq!(path.bucket(), Some("bucket"));
        assert_eq!(path.segments(), ["a", "b"]);
        assert!(path.is_absolute());
        assert!(!path.is_directory());
        assert_eq!(path.key(), "a/b");
    }

    #[test]
    fn test_parse_directory() {
        let path = p("/bucket/a/b/");
        assert!(path.is_directory());
        assert_eq!(path.key(), "a/b/");
        assert_eq!(path.to_string(), "/bucket/a/b/");
    }

    #[test]
    fn test_parse_bucket_root() {
        let root = p("/bucket");
        assert!(root.is_bucket_root());
        assert!(root.is_directory());
        assert_eq!(root.key(), "");
        assert_eq!(root, p("/bucket/"));
        assert_eq!(root, BucketPath::bucket_root("bucket"));
        assert_eq!(root.to_string(), "/bucket/");
    }

    #[test]
    fn test_parse_relative() {
        let path = p("a/b");
        assert_eq!(path.bucket(), None);
        assert!(!path.is_absolute());
        assert_eq!(path.to_string(), "a/b");

        let empty = p("");
        assert!(empty.is_empty());
        assert_eq!(empty, BucketPath::empty());
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn test_parse_collapses_separators() {
        assert_eq!(p("/bucket/a//b///c"), p("/bucket/a/b/c"));
        assert_eq!(p("a//b//"), p("a/b/"));
    }

    #[test]
    fn test_parse_rejects_missing_bucket() {
        assert!(matches!(
            BucketPath::parse("/"),
            Err(FsError::InvalidArgument { .. })
        ));
        assert!(matches!(
            BucketPath::parse("//bucket/a"),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_directory_flag_sensitivity() {
        assert_ne!(p("/b/dir"), p("/b/dir/"));
        assert_eq!(p("/b/dir").slash_toggled(), Some(p("/b/dir/")));
        assert_eq!(p("/b/dir/").slash_toggled(), Some(p("/b/dir")));
        assert_eq!(p("/b").slash_toggled(), None);
    }

    // ========================================================================
    // Parent / name access
    // ========================================================================

    #[test]
    fn test_parent() {
        assert_eq!(p("/b/a/c").parent(), Some(p("/b/a/")));
        assert_eq!(p("/b/a").parent(), Some(p("/b/")));
        assert_eq!(p("/b/").parent(), None);
        assert_eq!(p("a/b").parent(), Some(p("a/")));
        assert_eq!(p("").parent(), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(p("/b/a/file.txt").file_name(), Some(p("file.txt")));
        assert_eq!(p("/b/a/dir/").file_name(), Some(p("dir/")));
        assert_eq!(p("/b").file_name(), None);
    }

    #[test]
    fn test_get_name() {
        let path = p("/b/x/y/z");
        assert_eq!(path.name_count(), 3);
        assert_eq!(path.get_name(0).unwrap(), p("x/"));
        assert_eq!(path.get_name(2).unwrap(), p("z"));
        assert_eq!(p("/b/x/y/").get_name(1).unwrap(), p("y/"));
        assert!(matches!(
            path.get_name(3),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_subpath() {
        let path = p("/b/x/y/z");
        assert_eq!(path.subpath(1, 3).unwrap(), p("y/z"));
        assert_eq!(path.subpath(1, 2).unwrap(), p("y/"));
        assert_eq!(path.subpath(0, 2).unwrap(), p("/b/x/y/"));
        assert!(path.subpath(2, 4).is_err());
        assert!(path.subpath(2, 1).is_err());
    }

    // ========================================================================
    // Resolve / relativize
    // ========================================================================

    #[test]
    fn test_resolve() {
        let dir = p("/bucket/path/to/dir/");
        assert_eq!(
            dir.resolve(&p("child/xyz")).to_string(),
            "/bucket/path/to/dir/child/xyz"
        );
        assert_eq!(dir.resolve(&p("child/")), p("/bucket/path/to/dir/child/"));
        assert_eq!(dir.resolve(&p("/other/x")), p("/other/x"));
        assert_eq!(dir.resolve(&p("")), dir);
        assert_eq!(p("").resolve(&p("a/b")), p("a/b"));
    }

    #[test]
    fn test_resolve_sibling() {
        assert_eq!(p("/b/dir/file").resolve_sibling(&p("other")), p("/b/dir/other"));
        assert_eq!(p("/bucket").resolve_sibling(&p("")), p(""));
        assert_eq!(p("/bucket").resolve_sibling(&p("x")), p("x"));
    }

    #[test]
    fn test_relativize() {
        let base = p("/b/a/");
        assert_eq!(base.relativize(&p("/b/a/c/d")).unwrap(), p("c/d"));
        assert_eq!(base.relativize(&p("/b/a/")).unwrap(), BucketPath::empty());
        assert!(matches!(
            base.relativize(&p("/other/a/c")),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_resolve_relativize_inverse() {
        let base = p("/b/x/");
        let target = p("/b/x/y/z/");
        let rel = base.relativize(&target).unwrap();
        assert_eq!(base.resolve(&rel), target);
    }

    #[test]
    fn test_relativize_directory_flag_only() {
        let file = p("/b/a");
        let dir = p("/b/a/");

        let rel = file.relativize(&dir).unwrap();
        assert!(rel.is_empty());
        assert_eq!(file.resolve(&rel), file);
        assert_ne!(file.resolve(&rel), dir);

        let rel = dir.relativize(&file).unwrap();
        assert!(rel.is_empty());
        assert_eq!(dir.resolve(&rel), dir);
    }

    // ========================================================================
    // Normalize
    // ========================================================================

    #[test]
    fn test_normalize_dots() {
        assert_eq!(p("/b/a/./c").normalize().as_ref(), &p("/b/a/c"));
        assert_eq!(p("/b/a/../c").normalize().as_ref(), &p("/b/c"));
        assert_eq!(p("/b/a/c/..").normalize().as_ref(), &p("/b/a/"));
        assert_eq!(p("a/../b").normalize().as_ref(), &p("b"));
    }

    #[test]
    fn test_normalize_never_leaves_bucket() {
        assert_eq!(p("/bucket/..").normalize().to_string(), "/bucket/");
        assert_eq!(p("/bucket/../../x").normalize().as_ref(), &p("/bucket/x"));
    }

    #[test]
    fn test_normalize_unabsorbed_parent_is_identity() {
        let path = p("../a");
        let normalized = path.normalize();
        assert!(matches!(normalized, Cow::Borrowed(_)));
        assert!(std::ptr::eq(normalized.as_ref(), &path));

        let clean = p("/b/a");
        assert!(matches!(clean.normalize(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_idempotent() {
        for text in ["/b/a/./../c/", "x/../../y", "/b/..", "a/./b/.."] {
            let once = p(text).normalize().into_owned();
            let twice = once.normalize().into_owned();
            assert_eq!(once, twice, "{text}");
        }
    }

    // ========================================================================
    // Iteration / comparison
    // ========================================================================

    #[test]
    fn test_iter_flags() {
        let names: Vec<_> = p("/b/x/y/z").iter().collect();
        assert_eq!(names, vec![p("x/"), p("y/"), p("z")]);

        let names: Vec<_> = p("/b/x/y/").iter().collect();
        assert_eq!(names, vec![p("x/"), p("y/")]);

        assert_eq!(p("/b/").iter().count(), 0);
    }

    #[test]
    fn test_iter_restartable() {
        let path = p("a/b/c");
        let first: Vec<_> = path.iter().collect();
        let second: Vec<_> = (&path).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(path.iter().len(), 3);
    }

    #[test]
    fn test_starts_with() {
        let path = p("/b/x/y/z");
        assert!(path.starts_with(&p("/b/x/y")));
        assert!(path.starts_with(&p("/b/x/y/")));
        assert!(path.starts_with(&p("/b/")));
        assert!(!path.starts_with(&p("/c/x")));
        assert!(!path.starts_with(&p("x/y")));
        assert!(!path.starts_with(&p("")));
        assert!(p("").starts_with(&p("")));
        assert!(p("x/y").starts_with(&p("x")));
        assert!(!p("/b/xy").starts_with(&p("/b/x")));
    }

    #[test]
    fn test_ends_with() {
        let path = p("/b/x/y/z");
        assert!(path.ends_with(&p("y/z")));
        assert!(path.ends_with(&p("z")));
        assert!(!path.ends_with(&p("x/y")));
        assert!(!path.ends_with(&p("")));
        assert!(!path.ends_with(&p("/other/z")));
        assert!(p("").ends_with(&p("")));
        assert!(!p("a/bz").ends_with(&p("z")));
    }

    #[test]
    fn test_ordering_by_serialized_form() {
        let mut paths = vec![p("/b/z"), p("/b/a/"), p("/b/a"), p("/a/z")];
        paths.sort();
        let rendered: Vec<_> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["/a/z", "/b/a", "/b/a/", "/b/z"]);
    }
}
