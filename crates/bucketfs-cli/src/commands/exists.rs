use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to probe
    pub path: String,
}

#[instrument(level = "info", name = "cmd::exists", skip_all, fields(path = %args.path))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<bool> {
    let path = parse_path(&args.path)?;
    Ok(fs.exists(&path)?)
}
