//! CLI argument definitions using clap
//!
//! Commands:
//! - cruddydb check --config <path>
//! - cruddydb run --config <path> [script]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cruddydb - schema-validated CRUD over a namespaced key-value store
#[derive(Parser, Debug)]
#[command(name = "cruddydb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the configured schema and list its tables
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./cruddydb.json")]
        config: PathBuf,
    },

    /// Execute JSON-lines requests through the request queue
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./cruddydb.json")]
        config: PathBuf,

        /// Request file, one JSON request per line (stdin if omitted)
        script: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_script() {
        let cli = Cli::try_parse_from(["cruddydb", "run", "--config", "c.json", "requests.jsonl"]).unwrap();
        match cli.command {
            Command::Run { config, script } => {
                assert_eq!(config, PathBuf::from("c.json"));
                assert_eq!(script, Some(PathBuf::from("requests.jsonl")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_default_config() {
        let cli = Cli::try_parse_from(["cruddydb", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check { config } if config == PathBuf::from("./cruddydb.json")));
    }
}
