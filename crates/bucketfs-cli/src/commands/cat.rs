//! Cat command - print an object's contents.

use std::io::Write;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Object path (/bucket/key)
    pub path: String,
}

#[instrument(level = "info", name = "cmd::cat", skip_all, fields(path = %args.path))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;
    let data = fs.read_object(&path)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}
