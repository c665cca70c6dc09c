//! Error types for bucket filesystem operations.
//!
//! [`FsError`] is the single error type surfaced by the path algebra, the
//! attribute cache and the operations facade. Store collaborator failures are
//! wrapped in [`FsError::Store`] and are always propagated, never cached.
//!
//! [`ErrorCategory`] classifies an error into a small closed set that callers
//! can map onto POSIX errno values or log labels.

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by filesystem operations over an object store.
#[derive(Debug, Error)]
pub enum FsError {
    /// No object and no implicit directory exists at the path.
    #[error("no such file: {path}")]
    NotFound { path: String },

    /// The target of a create/copy/move already exists.
    #[error("file already exists: {path}")]
    AlreadyExists { path: String },

    /// The ACL probe did not grant the requested access mode.
    #[error("access denied: {path}: {reason}")]
    AccessDenied { path: String, reason: String },

    /// The object store has no primitive for this operation.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Malformed path text, cross-bucket relativize, out-of-range index.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Delete was requested on a directory that still has descendants.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    /// The store collaborator failed. A missing bucket or key still counts
    /// as [`ErrorCategory::NotFound`].
    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    pub(crate) fn not_found(path: impl ToString) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn already_exists(path: impl ToString) -> Self {
        Self::AlreadyExists {
            path: path.to_string(),
        }
    }

    pub(crate) fn access_denied(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns the semantic category of this error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from(self)
    }

    /// True for anything categorized as [`ErrorCategory::NotFound`],
    /// including a store reporting a missing bucket or key.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

/// Semantic category for filesystem errors.
///
/// # Example
///
/// ```
/// use bucketfs_core::error::{ErrorCategory, FsError};
///
/// let err = FsError::DirectoryNotEmpty { path: "/b/dir/".to_string() };
/// let category = ErrorCategory::from(&err);
///
/// assert_eq!(category, ErrorCategory::DirectoryNotEmpty);
/// assert_eq!(category.to_errno(), libc::ENOTEMPTY);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// ENOENT
    NotFound,
    /// EEXIST
    AlreadyExists,
    /// EACCES
    AccessDenied,
    /// ENOTSUP
    Unsupported,
    /// EINVAL
    InvalidArgument,
    /// ENOTEMPTY
    DirectoryNotEmpty,
    /// EIO: store and local I/O failures
    IoError,
}

impl ErrorCategory {
    /// Converts this category to a POSIX errno value.
    #[inline]
    pub fn to_errno(self) -> i32 {
        match self {
            Self::NotFound => libc::ENOENT,
            Self::AlreadyExists => libc::EEXIST,
            Self::AccessDenied => libc::EACCES,
            Self::Unsupported => libc::ENOTSUP,
            Self::InvalidArgument => libc::EINVAL,
            Self::DirectoryNotEmpty => libc::ENOTEMPTY,
            Self::IoError => libc::EIO,
        }
    }

    /// Stable label used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::AccessDenied => "access_denied",
            Self::Unsupported => "unsupported",
            Self::InvalidArgument => "invalid_argument",
            Self::DirectoryNotEmpty => "directory_not_empty",
            Self::IoError => "io_error",
        }
    }

    /// Not-found and access-denied are routine answers, not failures.
    pub fn is_expected(self) -> bool {
        matches!(self, Self::NotFound | Self::AccessDenied)
    }
}

impl From<&FsError> for ErrorCategory {
    fn from(e: &FsError) -> Self {
        match e {
            FsError::NotFound { .. } => Self::NotFound,
            FsError::AlreadyExists { .. } => Self::AlreadyExists,
            FsError::AccessDenied { .. } => Self::AccessDenied,
            FsError::Unsupported { .. } => Self::Unsupported,
            FsError::InvalidArgument { .. } => Self::InvalidArgument,
            FsError::DirectoryNotEmpty { .. } => Self::DirectoryNotEmpty,
            FsError::Store(StoreError::NoSuchBucket { .. } | StoreError::NoSuchKey { .. }) => {
                Self::NotFound
            }
            FsError::Store(StoreError::Backend(_)) => Self::IoError,
            FsError::Io(source) => io_error_category(source),
        }
    }
}

fn io_error_category(e: &io::Error) -> ErrorCategory {
    match e.kind() {
        io::ErrorKind::NotFound => ErrorCategory::NotFound,
        io::ErrorKind::PermissionDenied => ErrorCategory::AccessDenied,
        io::ErrorKind::AlreadyExists => ErrorCategory::AlreadyExists,
        io::ErrorKind::InvalidInput => ErrorCategory::InvalidArgument,
        io::ErrorKind::Unsupported => ErrorCategory::Unsupported,
        _ => ErrorCategory::IoError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_errno_mapping() {
        let cases = [
            (FsError::not_found("/b/a"), libc::ENOENT),
            (FsError::already_exists("/b/a"), libc::EEXIST),
            (FsError::access_denied("/b/a", "no grant"), libc::EACCES),
            (FsError::unsupported("atomic move"), libc::ENOTSUP),
            (FsError::invalid_argument("bad index"), libc::EINVAL),
            (
                FsError::DirectoryNotEmpty {
                    path: "/b/d/".to_string(),
                },
                libc::ENOTEMPTY,
            ),
        ];
        for (err, errno) in cases {
            assert_eq!(err.category().to_errno(), errno, "{err}");
        }
    }

    #[test]
    fn test_store_error_is_io() {
        let err = FsError::from(StoreError::Backend("connection reset".to_string()));
        assert_eq!(err.category(), ErrorCategory::IoError);
        assert!(!err.category().is_expected());
    }

    #[test]
    fn test_missing_bucket_or_key_is_not_found() {
        let bucket = FsError::from(StoreError::NoSuchBucket {
            bucket: "nope".to_string(),
        });
        assert_eq!(bucket.category(), ErrorCategory::NotFound);
        assert_eq!(bucket.category().to_errno(), libc::ENOENT);
        assert!(bucket.category().is_expected());

        let key = FsError::from(StoreError::NoSuchKey {
            bucket: "b".to_string(),
            key: "k".to_string(),
        });
        assert_eq!(key.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_io_error_kind_mapping() {
        let err = FsError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.category().is_expected());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            FsError::not_found("/bucket/missing").to_string(),
            "no such file: /bucket/missing"
        );
        assert_eq!(ErrorCategory::DirectoryNotEmpty.name(), "directory_not_empty");
    }
}
