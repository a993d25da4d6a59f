use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sonnet")]
#[command(about = "Keep your local blog library in sync with the cloud")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name holding remote and owner settings
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what a sync would change, without writing anything
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the local library with the remote store
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent sync runs, or one run in detail
    Log {
        /// Sync log ID to show in full
        id: Option<String>,
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List documents outside the trash
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List archived documents
    Trash {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the actions available for a document
    Actions {
        /// Document ID
        id: String,
    },
    /// Move a document and its pages to the trash
    Archive {
        /// Document ID
        id: String,
    },
    /// Move a document and its pages out of the trash
    Restore {
        /// Document ID
        id: String,
    },
    /// Delete a document and its pages on the next sync
    Delete {
        /// Document ID
        id: String,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Remote table holding documents
        #[arg(long, value_name = "NAME")]
        table: Option<String>,
        /// Account ID that owns the synced documents
        #[arg(long, value_name = "ID")]
        owner_id: Option<String>,
        /// Days to keep sync log entries
        #[arg(long, value_name = "DAYS")]
        log_retention_days: Option<u64>,
        /// Seconds between sync log pruning passes
        #[arg(long, value_name = "SECS")]
        housekeeping_interval_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}
