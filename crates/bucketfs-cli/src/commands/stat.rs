//! Stat command - show attributes of a path.
//!
//! Works for stored objects, directory markers, implicit directories and
//! bucket roots alike.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use bucketfs_core::FileSystem;
use bucketfs_core::store::MemoryStore;

use super::parse_path;
use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to inspect
    pub path: String,

    /// Include owner, group and permissions
    #[arg(long)]
    pub posix: bool,

    /// Attribute selector such as `basic:size,isDirectory` (overrides --posix)
    #[arg(long, short = 'a')]
    pub attributes: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::stat", skip_all, fields(path = %args.path))]
pub fn execute(fs: &FileSystem<MemoryStore>, args: &Args) -> Result<()> {
    let path = parse_path(&args.path)?;
    let selector = match (&args.attributes, args.posix) {
        (Some(selector), _) => selector.clone(),
        (None, true) => "posix:*".to_string(),
        (None, false) => "basic:*".to_string(),
    };
    let attributes = fs.read_attribute_map(&path, &selector)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&attributes)?);
        return Ok(());
    }

    let mut table = create_table(&["Attribute", "Value"]);
    for (name, value) in &attributes {
        table.add_row(vec![name.clone(), value.to_string()]);
    }
    println!("{path}");
    println!("{table}");
    Ok(())
}
