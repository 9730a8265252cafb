//! CI-script replay strategy.
//!
//! Runs the manifest's script commands verbatim, in order, inside the CI
//! environment image. Execution stops at the first failing command.

use super::workspace::SnapshotWorkspace;
use super::{CONTAINER_WORKSPACE, PackageBuildPipeline};
use crate::catalog::EnvironmentDescriptor;
use crate::container::{self, ContainerEngine, ContainerInvocation};
use crate::error::Result;
use crate::manifest::{self, CiManifest};
use std::path::PathBuf;

/// Script file name inside the workspace
pub const SCRIPT: &str = "ci-script.sh";

/// Render the manifest's script as a bash script that stops on error
pub fn render_script(manifest: &CiManifest) -> String {
    let mut script = String::from("#!/bin/bash\nset -e\n");
    for command in &manifest.script {
        script.push_str(command);
        if !command.ends_with('\n') {
            script.push('\n');
        }
    }
    script
}

pub(super) async fn package<E: ContainerEngine>(
    pipeline: &PackageBuildPipeline<'_, E>,
    descriptor: &EnvironmentDescriptor,
) -> Result<Vec<PathBuf>> {
    let manifest = manifest::load(&pipeline.layout.ci_manifest)?;

    let snapshotter = pipeline.snapshotter()?;
    let workspace = SnapshotWorkspace::create(pipeline.engine.elevation())?;
    snapshotter
        .checkout(pipeline.reference, &workspace.path().join("src"))
        .await?;
    std::fs::write(workspace.path().join(SCRIPT), render_script(&manifest))?;

    if pipeline.run_shell {
        pipeline.shell(descriptor, &workspace).await?;
    } else {
        let image = container::image_id(pipeline.engine, &descriptor.image_tag()).await?;
        let invocation = ContainerInvocation::builder(image)
            .hostname(&descriptor.name)
            .mount(workspace.path(), CONTAINER_WORKSPACE)
            .workdir(format!("{CONTAINER_WORKSPACE}/src"))
            .env("HOME", CONTAINER_WORKSPACE)
            .env("TMPDIR", format!("{CONTAINER_WORKSPACE}/tmp"))
            .user(pipeline.identity.uid, pipeline.identity.gid)
            .command(["bash".to_string(), format!("{CONTAINER_WORKSPACE}/{SCRIPT}")])
            .build();
        container::run(pipeline.engine, &invocation).await?;
    }

    workspace.close()?;
    Ok(Vec::new())
}
