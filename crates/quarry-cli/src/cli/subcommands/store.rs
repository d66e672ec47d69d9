use clap::Subcommand;

/// Direct access to the durable store.
#[derive(Clone, Debug, Subcommand)]
pub enum StoreCommands {
    /// List objects, optionally under a prefix.
    Ls {
        /// Key prefix (e.g. `api-data`).
        prefix: Option<String>,
    },
    /// Write an object's bytes to stdout.
    Cat {
        /// Object key (e.g. `api-data/latest.json`).
        key: String,
    },
}
