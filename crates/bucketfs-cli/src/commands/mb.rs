//! Make bucket command.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::store::{MemoryStore, ObjectStore, Owner};
use bucketfs_core::{FileSystem, FsError};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Bucket name
    pub name: String,

    /// Owner display name (defaults to the identity)
    #[arg(long)]
    pub display_name: Option<String>,
}

#[instrument(level = "info", name = "cmd::mb", skip_all, fields(bucket = %args.name))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let name = args.name.trim_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(FsError::InvalidArgument {
            reason: format!("invalid bucket name: {}", args.name),
        }
        .into());
    }
    if fs.store().head_bucket(name)? {
        return Err(FsError::AlreadyExists {
            path: format!("/{name}"),
        }
        .into());
    }

    let id = fs.identity().unwrap_or("local");
    let display = args.display_name.as_deref().unwrap_or(id);
    fs.store().create_bucket(name, Owner::new(id, display))?;
    println!("Created bucket: {name}");
    Ok(())
}
