//! Command execution functions.
//!
//! Every subcommand resolves its environment tokens against the catalog
//! before any container work starts, then reports failures with recovery
//! suggestions and a non-zero exit code.

mod build_images;
mod docker_gc;
mod make;
mod pkg;

use crate::catalog::Catalog;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use build_images::execute_build_images;
use docker_gc::execute_docker_gc;
use make::execute_make;
use pkg::execute_pkg;

/// Exit code reported when a subcommand fails
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Execute the selected subcommand based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(FAILURE_EXIT_CODE);
    }

    let result = match (RuntimeConfig::from_args(&args), Catalog::builtin()) {
        (Ok(config), Ok(catalog)) => {
            let result = dispatch(&args, &config, &catalog).await;
            report(&args, &config, result)
        }
        (Err(e), _) => {
            let output = super::OutputManager::new(false, false);
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));
            FAILURE_EXIT_CODE
        }
        (_, Err(e)) => {
            let output = super::OutputManager::new(false, false);
            output.error(&format!("Environment catalog is invalid: {}", e));
            FAILURE_EXIT_CODE
        }
    };
    Ok(result)
}

async fn dispatch(args: &Args, config: &RuntimeConfig, catalog: &Catalog) -> Result<i32> {
    match &args.command {
        Command::BuildImages { .. } => execute_build_images(args, config, catalog)
            .await
            .map(|()| 0),
        Command::Make { .. } => execute_make(args, config, catalog).await,
        Command::Pkg { .. } => execute_pkg(args, config, catalog).await.map(|()| 0),
        Command::DockerGc => execute_docker_gc(config).await.map(|()| 0),
    }
}

fn report(args: &Args, config: &RuntimeConfig, result: Result<i32>) -> i32 {
    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            config.error_println(&format!(
                "Command '{}' failed: {}",
                args.command.name(),
                e
            ));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }

            FAILURE_EXIT_CODE
        }
    }
}
