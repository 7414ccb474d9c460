//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "entgraph",
    version,
    author = "neur0map",
    about = "Typed security entity modeling and reference graphs",
    long_about = "entgraph builds typed security entities from JSON alert and event records, \
                  links nested entities into a reference graph, and compares, merges and \
                  serializes them."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/entgraph/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build entities from a JSON file and print them as plain maps
    Load {
        /// JSON file holding one record or an array of records
        file: PathBuf,

        /// Entity kind to use for records without a Type tag
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Build entities and print their reference graph
    Graph {
        /// JSON file holding one record or an array of records
        file: PathBuf,

        /// Entity kind to use for records without a Type tag
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Merge two entities, reporting conflicting identifiers
    Merge {
        /// First record
        first: PathBuf,

        /// Second record
        second: PathBuf,

        /// Entity kind to use for records without a Type tag
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Build a process entity from a process-creation event
    Event {
        /// JSON file holding the event record
        file: PathBuf,
    },

    /// List registered entity kinds and their schemas
    Kinds,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from(["entgraph", "merge", "a.json", "b.json", "--kind", "host"])
            .unwrap();
        match cli.command {
            Commands::Merge { first, second, kind } => {
                assert_eq!(first, PathBuf::from("a.json"));
                assert_eq!(second, PathBuf::from("b.json"));
                assert_eq!(kind.as_deref(), Some("host"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
