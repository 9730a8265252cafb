//! build-images command implementation.
//!
//! Renders each environment's Dockerfile and builds its image.

use crate::catalog::Catalog;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::container::{self, ImageBuildOptions};
use crate::dockerfile::DockerfileGenerator;
use crate::error::Result;

/// Execute build-images command
pub(super) async fn execute_build_images(
    args: &Args,
    config: &RuntimeConfig,
    catalog: &Catalog,
) -> Result<()> {
    let Command::BuildImages {
        environments,
        no_pull,
    } = &args.command
    else {
        unreachable!("execute_build_images called with non-BuildImages command");
    };

    let descriptors = catalog.resolve_all(environments)?;
    let engine = config.engine()?;
    let generator = DockerfileGenerator::new(&config.layout().ci_manifest);
    let options = ImageBuildOptions {
        pull: !no_pull,
        proxy: config.layout().proxy(),
    };
    if let Some(proxy) = &options.proxy {
        config.verbose_println(&format!("Using HTTP proxy {}", proxy));
    }

    for descriptor in descriptors {
        config.section(&descriptor.image_tag());
        let spec = generator.generate(descriptor)?;
        if config.is_verbose() {
            for line in spec.lines() {
                config.indent(&line);
            }
        }
        let id = container::build_image(&engine, descriptor, &spec, &options).await?;
        config.success_println(&format!("{} → {}", descriptor.image_tag(), id));
    }

    Ok(())
}
