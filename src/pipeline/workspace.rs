//! Ephemeral snapshot workspace.
//!
//! Containers may leave root-owned files behind, so removal falls back to
//! the engine's elevation command when ordinary removal fails.

use crate::error::{Result, WorkspaceError};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Scratch subdirectory name
const SCRATCH: &str = "tmp";

/// Per-invocation directory holding the extracted source and scratch space.
///
/// Removed by [`SnapshotWorkspace::close`] on success, and by `Drop` on every
/// other exit path.
#[derive(Debug)]
pub struct SnapshotWorkspace {
    root: PathBuf,
    elevation: Vec<String>,
    closed: bool,
}

impl SnapshotWorkspace {
    /// Create a fresh workspace under the system temp directory
    pub fn create(elevation: Vec<String>) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), elevation)
    }

    /// Create a fresh workspace under `parent`
    pub fn create_in(parent: &Path, elevation: Vec<String>) -> Result<Self> {
        let root = parent.join(format!("distro-build-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join(SCRATCH))?;
        log::debug!("Created workspace {}", root.display());
        Ok(Self {
            root,
            elevation,
            closed: false,
        })
    }

    /// Workspace root on the host
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Scratch temp directory on the host
    pub fn scratch(&self) -> PathBuf {
        self.root.join(SCRATCH)
    }

    /// Remove the workspace, escalating if ordinary removal fails
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        remove(&self.root, &self.elevation).map_err(Into::into)
    }
}

impl Drop for SnapshotWorkspace {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = remove(&self.root, &self.elevation) {
            log::warn!("{}", e);
        }
    }
}

fn remove(root: &Path, elevation: &[String]) -> std::result::Result<(), WorkspaceError> {
    if !root.exists() {
        return Ok(());
    }
    let ordinary = match std::fs::remove_dir_all(root) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    log::warn!(
        "Removing {} failed ({}), retrying with elevated privileges",
        root.display(),
        ordinary
    );

    let mut argv: Vec<String> = if elevation.is_empty() {
        vec!["sudo".to_string()]
    } else {
        elevation.to_vec()
    };
    argv.extend(["rm".to_string(), "-rf".to_string(), root.display().to_string()]);

    let status = std::process::Command::new(&argv[0])
        .args(&argv[1..])
        .stdout(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() && !root.exists() => Ok(()),
        Ok(status) => Err(WorkspaceError::CleanupFailed {
            path: root.to_path_buf(),
            reason: format!(
                "{}; '{}' exited with {}",
                ordinary,
                argv.join(" "),
                status.code().unwrap_or(-1)
            ),
        }),
        Err(e) => Err(WorkspaceError::CleanupFailed {
            path: root.to_path_buf(),
            reason: format!("{}; '{}' could not start: {}", ordinary, argv.join(" "), e),
        }),
    }
}
