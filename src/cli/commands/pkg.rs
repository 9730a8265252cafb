//! pkg command implementation.
//!
//! Packages a committed revision and lists every relocated artifact.

use crate::catalog::Catalog;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::pipeline::{PackageBuildPipeline, PackageOutcome};

/// Execute pkg command
pub(super) async fn execute_pkg(args: &Args, config: &RuntimeConfig, catalog: &Catalog) -> Result<()> {
    let Command::Pkg {
        environment,
        run_shell,
        reference,
    } = &args.command
    else {
        unreachable!("execute_pkg called with non-Pkg command");
    };

    let descriptors = catalog.resolve(environment)?;
    let engine = config.engine()?;
    config.info(&format!(
        "Packaging {} for {} environment(s)",
        reference,
        descriptors.len()
    ));
    let reports = PackageBuildPipeline::new(&engine, config.layout())
        .with_reference(reference)
        .with_run_shell(*run_shell)
        .package_all(&descriptors)
        .await?;

    if *run_shell {
        return Ok(());
    }

    config.section("Packages");
    for report in reports {
        match report.outcome {
            PackageOutcome::Built(artifacts) if artifacts.is_empty() => {
                config.success_println(&format!("{}: completed", report.environment));
            }
            PackageOutcome::Built(artifacts) => {
                config.success_println(&format!(
                    "{}: {} package(s)",
                    report.environment,
                    artifacts.len()
                ));
                for artifact in artifacts {
                    config.indent(&artifact.display().to_string());
                }
            }
            PackageOutcome::Skipped(reason) => {
                config.warning_println(&format!("{}: skipped ({})", report.environment, reason));
            }
        }
    }

    Ok(())
}
