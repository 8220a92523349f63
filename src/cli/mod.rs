//! CLI module for cruddydb
//!
//! Provides command-line interface for:
//! - check: Compile the configured schema
//! - run: Execute JSON-lines requests through the request queue

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, check_to, run, run_command, run_script, run_script_to};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_json_to};
