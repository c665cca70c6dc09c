//! Path algebra commands. These never touch the store.

use anyhow::Result;
use clap::Subcommand;
use tracing::instrument;

use bucketfs_core::BucketPath;

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Show the components of a path
    Parse {
        path: String,
    },
    /// Remove `.` and `..` segments
    Normalize {
        path: String,
    },
    /// Resolve `other` against `base`
    Resolve {
        base: String,
        other: String,
    },
    /// Relative path from `base` to `other`
    Relativize {
        base: String,
        other: String,
    },
}

#[instrument(level = "info", name = "cmd::path", skip_all)]
pub fn execute(command: &Command) -> Result<()> {
    match command {
        Command::Parse { path } => {
            let p = BucketPath::parse(path)?;
            println!("path:      {p}");
            println!("bucket:    {}", p.bucket().unwrap_or("-"));
            println!("key:       {}", p.key());
            println!("absolute:  {}", p.is_absolute());
            println!("directory: {}", p.is_directory());
            let names: Vec<String> = p.iter().map(|n| n.to_string()).collect();
            println!("names:     {}", names.join(" "));
        }
        Command::Normalize { path } => {
            println!("{}", BucketPath::parse(path)?.normalize());
        }
        Command::Resolve { base, other } => {
            let base = BucketPath::parse(base)?;
            println!("{}", base.resolve(&BucketPath::parse(other)?));
        }
        Command::Relativize { base, other } => {
            let base = BucketPath::parse(base)?;
            println!("{}", base.relativize(&BucketPath::parse(other)?)?);
        }
    }
    Ok(())
}
