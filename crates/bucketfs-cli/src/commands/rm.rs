//! Remove command.
//!
//! Directories must be empty unless `-r` is given, in which case the tree is
//! walked and removed deepest first.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{debug, instrument};

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to remove
    pub path: String,

    /// Remove directories and their contents
    #[arg(short, long)]
    pub recursive: bool,
}

#[instrument(level = "info", name = "cmd::rm", skip_all, fields(path = %args.path, recursive = args.recursive))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;

    if args.recursive && fs.is_directory(&path)? && !path.is_bucket_root() {
        let mut entries = fs.walk(&path)?.collect::<Result<Vec<_>, _>>()?;
        // Walk order is lexicographic, so reversing puts children before parents.
        entries.reverse();
        for entry in entries {
            debug!(path = %entry.path, "removing");
            fs.delete(&entry.path)?;
        }
        return Ok(fs.delete(&path.with_directory(true))?);
    }

    Ok(fs.delete(&path)?)
}
