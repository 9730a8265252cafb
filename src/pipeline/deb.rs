//! Debian packaging strategy.
//!
//! The committed tree is checked out into the workspace; the packaging
//! directory is copied in as `debian/` when the tree does not carry one.
//! `debian/rules build` runs under the invoking user's credentials and only
//! `debian/rules binary` runs as root.

use super::privdrop::{DropPlan, Phase};
use super::workspace::SnapshotWorkspace;
use super::{CONTAINER_WORKSPACE, PackageBuildPipeline, artifacts};
use crate::catalog::EnvironmentDescriptor;
use crate::container::ContainerEngine;
use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Checkout directory under `<workspace>/src`
const CHECKOUT: &str = "project";

/// Copy a directory tree, preserving permissions of regular files
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Ensure `checkout/debian` exists, copying from `packaging` if needed.
///
/// The copy prefers the committed packaging directory inside the checkout and
/// falls back to the host path.
pub fn install_packaging(checkout: &Path, packaging: &Path, host_packaging: &Path) -> Result<()> {
    let debian = checkout.join("debian");
    if debian.is_dir() {
        return Ok(());
    }
    let committed = checkout.join(packaging);
    let from = if committed.is_dir() {
        committed
    } else {
        host_packaging.to_path_buf()
    };
    log::debug!("Installing {} as debian/", from.display());
    copy_tree(&from, &debian)
}

pub(super) async fn package<E: ContainerEngine>(
    pipeline: &PackageBuildPipeline<'_, E>,
    descriptor: &EnvironmentDescriptor,
    packaging: &Path,
) -> Result<Vec<PathBuf>> {
    let snapshotter = pipeline.snapshotter()?;
    let workspace = SnapshotWorkspace::create(pipeline.engine.elevation())?;
    let checkout = workspace.path().join("src").join(CHECKOUT);
    snapshotter.checkout(pipeline.reference, &checkout).await?;
    install_packaging(&checkout, packaging, &pipeline.layout.resolve(packaging))?;

    let plan = DropPlan::new(pipeline.identity.clone(), CONTAINER_WORKSPACE)
        .then(Phase::unprivileged(["debian/rules", "build"]))
        .then(Phase::privileged(["debian/rules", "binary"]));

    let workdir = format!("{CONTAINER_WORKSPACE}/src/{CHECKOUT}");
    let built = pipeline
        .launch(descriptor, &workspace, &workdir, &plan)
        .await?;
    let artifacts = if built {
        artifacts::harvest(
            &descriptor.name,
            &[workspace.path().join("src")],
            "deb",
            &pipeline.output_dir(descriptor),
        )?
    } else {
        Vec::new()
    };

    workspace.close()?;
    Ok(artifacts)
}
