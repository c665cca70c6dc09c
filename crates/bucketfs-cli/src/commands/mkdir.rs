use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory path (/bucket/dir)
    pub path: String,
}

#[instrument(level = "info", name = "cmd::mkdir", skip_all, fields(path = %args.path))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;
    fs.create_directory(&path)?;
    Ok(())
}
