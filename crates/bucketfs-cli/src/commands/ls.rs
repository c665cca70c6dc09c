//! List command - list the children of a directory.
//!
//! # Examples
//!
//! ```bash
//! # Every bucket, with owner and creation date
//! bucketfs ls -l /
//!
//! # Immediate children, implicit directories included
//! bucketfs ls /photos
//!
//! # Everything below a prefix
//! bucketfs ls -r /photos/2024
//!
//! # Output as JSON for scripting
//! bucketfs ls --json /photos | jq '.entries[].path'
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use bucketfs_core::store::MemoryStore;
use bucketfs_core::{DirEntry, FileStore, FileSystem};

use super::parse_path;
use crate::output::{create_table, format_size, format_time};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory to list (/bucket or /bucket/dir), or / for every bucket
    pub path: String,

    /// List every descendant
    #[arg(short, long)]
    pub recursive: bool,

    /// Show size and modification time
    #[arg(short, long)]
    pub long: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct LsOutput {
    path: String,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    path: String,
    #[serde(rename = "type")]
    entry_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

#[derive(Serialize)]
struct BucketsOutput {
    buckets: Vec<BucketEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketEntry {
    name: String,
    root: String,
    owner_id: String,
    owner_display_name: String,
    creation_date: String,
}

#[instrument(level = "info", name = "cmd::ls", skip_all, fields(path = %args.path, recursive = args.recursive))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    if args.path.trim_matches('/').is_empty() {
        return list_buckets(fs, args);
    }
    let dir = parse_path(&args.path)?;
    let entries: Vec<DirEntry> = if args.recursive {
        fs.walk(&dir)?.collect::<Result<_, _>>()?
    } else {
        fs.list_directory(&dir)?.collect::<Result<_, _>>()?
    };

    if args.json {
        let output = LsOutput {
            path: dir.with_directory(true).to_string(),
            entries: entries
                .iter()
                .map(|entry| EntryInfo {
                    path: entry.path.to_string(),
                    entry_type: if entry.is_directory() { "directory" } else { "file" },
                    size: entry.meta.as_ref().map(|m| m.size),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.long {
        let mut table = create_table(&["Path", "Type", "Size", "Modified"]);
        for entry in &entries {
            let (size, modified) = match &entry.meta {
                Some(meta) => (format_size(meta.size), format_time(Some(meta.last_modified))),
                None => ("-".to_string(), "-".to_string()),
            };
            let kind = if entry.is_directory() { "dir" } else { "file" };
            table.add_row(vec![entry.path.to_string(), kind.to_string(), size, modified]);
        }
        println!("{table}");
    } else {
        for entry in &entries {
            println!("{}", entry.path);
        }
    }
    Ok(())
}

/// Lists buckets as root directories. `--recursive` has no effect here.
fn list_buckets(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    if args.json || args.long {
        let stores: Vec<FileStore> = fs.file_stores()?;
        if args.json {
            let output = BucketsOutput {
                buckets: stores
                    .iter()
                    .map(|store| BucketEntry {
                        name: store.name().to_string(),
                        root: store.root_directory().to_string(),
                        owner_id: store.owner().id.clone(),
                        owner_display_name: store.owner().display_name.clone(),
                        creation_date: format_time(Some(store.creation_date())),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let mut table = create_table(&["Bucket", "Owner", "Created"]);
            for store in &stores {
                table.add_row(vec![
                    store.root_directory().to_string(),
                    store.owner().principal(),
                    format_time(Some(store.creation_date())),
                ]);
            }
            println!("{table}");
        }
    } else {
        for root in fs.root_directories()? {
            println!("{root}");
        }
    }
    Ok(())
}
