//! docker-gc command implementation.

use crate::cli::RuntimeConfig;
use crate::container::collect_garbage;
use crate::error::Result;

/// Execute docker-gc command
pub(super) async fn execute_docker_gc(config: &RuntimeConfig) -> Result<()> {
    let engine = config.engine()?;
    config.info("Collecting exited containers and dangling images");
    let report = collect_garbage(&engine).await?;
    config.success_println(&format!(
        "Removed {} exited container(s) and {} dangling image(s)",
        report.containers.len(),
        report.images.len()
    ));
    Ok(())
}
