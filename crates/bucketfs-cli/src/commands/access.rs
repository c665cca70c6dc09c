//! Access command - check read/write access for the configured identity.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::store::MemoryStore;
use bucketfs_core::{AccessMode, FileSystem};

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to check
    pub path: String,

    /// Modes to check: any of `r`, `w`, `x`. Empty checks existence only.
    #[arg(default_value = "")]
    pub modes: String,
}

#[instrument(level = "info", name = "cmd::access", skip_all, fields(path = %args.path, modes = %args.modes))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;
    let modes = AccessMode::parse_modes(&args.modes)?;
    fs.check_access(&path, &modes)?;
    println!("ok");
    Ok(())
}
