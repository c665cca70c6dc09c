use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::store::MemoryStore;
use bucketfs_core::{CopyOptions, FileSystem};

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Source object
    pub source: String,

    /// Destination object
    pub dest: String,

    /// Overwrite an existing destination
    #[arg(short, long)]
    pub replace: bool,
}

#[instrument(level = "info", name = "cmd::cp", skip_all, fields(src = %args.source, dst = %args.dest))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let src = parse_path(&args.source)?;
    let dst = parse_path(&args.dest)?;
    let mut options = CopyOptions::new();
    if args.replace {
        options = options.replace_existing();
    }
    fs.copy(&src, &dst, options)?;
    Ok(())
}
