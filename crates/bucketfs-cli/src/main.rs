#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;
mod store_file;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bucketfs_core::{ErrorCategory, FileSystem, FsError};

use crate::commands::{access, cat, cp, exists, ls, mb, mkdir, mv, path, put, rm, stat};

/// Browse and modify an object store as a filesystem
#[derive(Parser)]
#[command(name = "bucketfs")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Create a bucket and upload a file
    bucketfs --store demo.json mb photos
    bucketfs --store demo.json put /photos/2024/beach.jpg ./beach.jpg

    # Implicit directories appear from deeper keys
    bucketfs --store demo.json ls /photos
    bucketfs --store demo.json stat --posix /photos/2024

    # Path algebra without touching the store
    bucketfs path normalize /photos/a/../b
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Store file (JSON), created if missing
    #[arg(long, env = "BUCKETFS_STORE", global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, env = "BUCKETFS_CONFIG", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Canonical user id used for ACL checks
    #[arg(long, env = "BUCKETFS_IDENTITY", global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ============ Store commands ============
    /// Create a bucket
    Mb(mb::Args),

    /// Upload a local file (or stdin) as an object
    Put(put::Args),

    /// Print an object's contents
    Cat(cat::Args),

    /// List a directory
    Ls(ls::Args),

    /// Show attributes of a path
    Stat(stat::Args),

    /// Exit 0 if the path exists, 1 otherwise
    Exists(exists::Args),

    /// Create a directory marker
    Mkdir(mkdir::Args),

    /// Remove a file or empty directory
    Rm(rm::Args),

    /// Copy an object
    Cp(cp::Args),

    /// Move an object
    Mv(mv::Args),

    /// Check access to a path
    Access(access::Args),

    // ============ Standalone commands (no store required) ============
    /// Path algebra
    #[command(subcommand)]
    Path(path::Command),
}

impl Commands {
    /// True for commands that change the store.
    fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Mb(_) | Self::Put(_) | Self::Mkdir(_) | Self::Rm(_) | Self::Cp(_) | Self::Mv(_)
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if !cli.quiet {
        setup_tracing(cli.verbose);
    }
    let quiet = cli.quiet;

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            if !quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    if let Commands::Path(command) = &cli.command {
        path::execute(command)?;
        return Ok(exit_code::SUCCESS);
    }

    let mut fs_config = config::load(cli.config.as_deref())?;
    if let Some(identity) = cli.identity {
        fs_config.identity = Some(identity);
    }

    let store_path = match cli.store {
        Some(path) => path,
        None => store_file::default_path()?,
    };
    let store = Arc::new(store_file::load(&store_path)?);
    let fs = FileSystem::new(Arc::clone(&store), fs_config);
    tracing::debug!(store = %store_path.display(), ?fs, "opened filesystem");

    let mutates = cli.command.mutates();
    let code = match &cli.command {
        Commands::Mb(args) => mb::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Put(args) => put::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Cat(args) => cat::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Ls(args) => ls::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Stat(args) => stat::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Exists(args) => {
            if exists::execute(&fs, args)? {
                exit_code::SUCCESS
            } else {
                exit_code::GENERAL_ERROR
            }
        }
        Commands::Mkdir(args) => mkdir::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Rm(args) => rm::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Cp(args) => cp::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Mv(args) => mv::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Access(args) => access::execute(&fs, args).map(|()| exit_code::SUCCESS)?,
        Commands::Path(_) => exit_code::SUCCESS,
    };

    if mutates {
        store_file::save(&store, &store_path)?;
    }
    Ok(code)
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Maps an error to an exit code by its category.
///
/// Walks the error chain so context added with `anyhow` does not hide the
/// underlying [`FsError`].
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(fs_err) = cause.downcast_ref::<FsError>() {
            return match fs_err.category() {
                ErrorCategory::NotFound => exit_code::NOT_FOUND,
                ErrorCategory::AccessDenied => exit_code::PERMISSION_DENIED,
                ErrorCategory::AlreadyExists => exit_code::ALREADY_EXISTS,
                ErrorCategory::DirectoryNotEmpty => exit_code::NOT_EMPTY,
                ErrorCategory::Unsupported => exit_code::UNSUPPORTED,
                ErrorCategory::InvalidArgument => exit_code::INVALID_ARGUMENT,
                ErrorCategory::IoError => exit_code::GENERAL_ERROR,
            };
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied => return exit_code::PERMISSION_DENIED,
                io::ErrorKind::NotFound => return exit_code::NOT_FOUND,
                _ => {}
            }
        }
    }
    exit_code::GENERAL_ERROR
}
