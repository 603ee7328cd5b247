use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// README Collection Synchronization Tool
///
/// Mirror documentation files from many source folders into one collection folder and sync edits both ways
#[derive(Parser, Debug)]
#[command(name = "readmesync")]
#[command(about, long_about = None, version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use specific config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one full sync pass
    Sync,

    /// Sync the single pair a file belongs to
    SyncFile {
        /// Source or collection file
        path: PathBuf,
    },

    /// Remove orphaned mappings and move unlinked files aside
    Cleanup,

    /// Show mapping counts and daemon health
    Status,

    /// List every source/collection mapping
    Mappings,

    /// Preview collection files cleanup would move aside
    ListUnlinked,

    /// List mappings waiting for manual conflict resolution
    Conflicts,

    /// Run in the foreground with timers and the file watcher
    Daemon,
}
