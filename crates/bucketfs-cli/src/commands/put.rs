//! Put command - upload a local file or stdin as an object.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Destination path (/bucket/key)
    pub path: String,

    /// Local source file, `-` for stdin
    #[arg(default_value = "-")]
    pub source: PathBuf,
}

#[instrument(level = "info", name = "cmd::put", skip_all, fields(path = %args.path))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;
    let data = if args.source.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read(&args.source)
            .with_context(|| format!("Failed to read {}", args.source.display()))?
    };
    fs.write_object(&path, &data)?;
    Ok(())
}
