//! Command line interface for distro_build.
//!
//! Parses arguments, builds the runtime configuration and dispatches to the
//! subcommand executors.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use commands::{FAILURE_EXIT_CODE, execute_command};
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
