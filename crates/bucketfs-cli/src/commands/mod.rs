pub mod access;
pub mod cat;
pub mod cp;
pub mod exists;
pub mod ls;
pub mod mb;
pub mod mkdir;
pub mod mv;
pub mod path;
pub mod put;
pub mod rm;
pub mod stat;

use anyhow::{Context, Result};
use bucketfs_core::BucketPath;

/// Parses a command-line path as absolute, adding the leading `/` if missing.
pub fn parse_path(text: &str) -> Result<BucketPath> {
    let absolute = if text.starts_with('/') {
        text.to_string()
    } else {
        format!("/{text}")
    };
    BucketPath::parse(&absolute).with_context(|| format!("Invalid path: {text}"))
}
