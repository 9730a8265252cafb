//! Artifact discovery and relocation.
//!
//! Packages are found by extension under the workspace and moved into the
//! per-environment output directory. Each one is checked for being non-empty
//! before it leaves the workspace.

use crate::error::{PackagingError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Find every regular file under `roots` whose extension is `extension`.
///
/// Missing roots are skipped. Results are sorted for stable reporting.
pub fn collect(roots: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) == Some(extension) {
                found.push(entry.into_path());
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Move `artifacts` into `destination`, returning their new paths.
///
/// Falls back to copy-and-remove when a rename crosses filesystems.
pub fn relocate(artifacts: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(destination)?;
    let mut moved = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let metadata = std::fs::metadata(artifact)?;
        if metadata.len() == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Artifact is empty (0 bytes): {}", artifact.display()),
            )
            .into());
        }

        let Some(name) = artifact.file_name() else {
            continue;
        };
        let target = destination.join(name);
        if std::fs::rename(artifact, &target).is_err() {
            std::fs::copy(artifact, &target)?;
            std::fs::remove_file(artifact)?;
        }
        log::info!("Collected {}", target.display());
        moved.push(target);
    }
    Ok(moved)
}

/// Collect by extension and relocate, failing when nothing was produced
pub fn harvest(
    environment: &str,
    roots: &[PathBuf],
    extension: &str,
    destination: &Path,
) -> Result<Vec<PathBuf>> {
    let found = collect(roots, extension)?;
    if found.is_empty() {
        return Err(PackagingError::NoArtifacts {
            environment: environment.to_string(),
            dir: roots.first().cloned().unwrap_or_default(),
        }
        .into());
    }
    relocate(&found, destination)
}
