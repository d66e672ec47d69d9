use clap::{Args, Subcommand};
use quarry_core::SourceDataset;

use crate::cli::subcommands::StoreCommands;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run the scheduler and analytics workers until interrupted.
    Run,
    /// Run the fetcher once.
    Sync(SyncArgs),
    /// Compute analytics from the current latest objects.
    Analyze,
    /// Show dataset freshness and queue depth.
    Status,
    /// Inspect the durable store.
    Store {
        #[command(subcommand)]
        action: StoreCommands,
    },
    /// Show the effective configuration (credentials redacted).
    Config(ConfigArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SyncArgs {
    /// Sync only one dataset: website or api.
    #[arg(long)]
    pub only: Option<SourceDataset>,

    /// Process the analytics triggers the sync enqueued before exiting.
    #[arg(long)]
    pub analyze: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ConfigArgs {
    /// Render as TOML instead of the output format.
    #[arg(long)]
    pub toml: bool,
}
