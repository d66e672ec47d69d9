use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `quarry` binary.
#[derive(Debug, Parser)]
#[command(
    name = "quarry",
    version,
    about = "Quarry - scheduled fetch, store, and analytics pipeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file layered above the discovered ones
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use quarry_core::SourceDataset;

    use super::{Cli, Commands, OutputFormat};
    use crate::cli::subcommands::StoreCommands;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["quarry", "--format", "raw", "--verbose", "status"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["quarry", "analyze", "--quiet", "--config", "/tmp/q.toml"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(
            cli.global_flags().config.as_deref(),
            Some(std::path::Path::new("/tmp/q.toml"))
        );
        assert!(matches!(cli.command, Commands::Analyze));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["quarry", "-q", "-v", "status"]).is_err());
    }

    #[test]
    fn sync_accepts_dataset_filter() {
        let cli = Cli::try_parse_from(["quarry", "sync", "--only", "api", "--analyze"])
            .expect("cli should parse");

        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.only, Some(SourceDataset::ApiSnapshot));
        assert!(args.analyze);
    }

    #[test]
    fn sync_rejects_unknown_dataset() {
        assert!(Cli::try_parse_from(["quarry", "sync", "--only", "ftp"]).is_err());
    }

    #[test]
    fn store_subcommands_parse() {
        let cli = Cli::try_parse_from(["quarry", "store", "cat", "api-data/latest.json"])
            .expect("cli should parse");

        assert!(matches!(
            cli.command,
            Commands::Store {
                action: StoreCommands::Cat { ref key }
            } if key == "api-data/latest.json"
        ));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["quarry", "--format", "table", "status"]).is_err());
    }
}
