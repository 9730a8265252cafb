//! make command implementation.

use crate::catalog::Catalog;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::incremental::IncrementalBuildDriver;

/// Execute make command, returning the build's exit code
pub(super) async fn execute_make(
    args: &Args,
    config: &RuntimeConfig,
    catalog: &Catalog,
) -> Result<i32> {
    let Command::Make {
        environment,
        run_shell,
        args: build_args,
    } = &args.command
    else {
        unreachable!("execute_make called with non-Make command");
    };

    let descriptors = catalog.resolve(environment)?;
    let engine = config.engine()?;
    config.verbose_println(&format!(
        "Building {} in {}",
        descriptors
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.layout().root.display()
    ));

    IncrementalBuildDriver::new(&engine, config.layout())
        .with_run_shell(*run_shell)
        .run(&descriptors, build_args)
        .await
}
