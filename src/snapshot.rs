//! Reproducible source snapshots from version control.
//!
//! Snapshots are taken from the repository's object store, never from the
//! working tree, so uncommitted edits are always left out.

use crate::error::{Result, SnapshotError};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Produces source trees for a revision of one repository
#[derive(Debug, Clone)]
pub struct SourceSnapshotter {
    git_dir: PathBuf,
    work_tree: PathBuf,
    objects_dir: PathBuf,
    git: PathBuf,
}

fn archive_format(destination: &Path) -> Option<&'static str> {
    let name = destination.file_name()?.to_str()?;
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some("tar.gz")
    } else if name.ends_with(".tar") {
        Some("tar")
    } else if name.ends_with(".zip") {
        Some("zip")
    } else {
        None
    }
}

impl SourceSnapshotter {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let repo = gix::discover(path).map_err(|e| {
            log::debug!("Repository discovery failed at {}: {}", path.display(), e);
            SnapshotError::NotRepository {
                path: path.to_path_buf(),
            }
        })?;
        let work_tree = repo
            .workdir()
            .ok_or_else(|| SnapshotError::NotRepository {
                path: path.to_path_buf(),
            })?
            .to_path_buf();
        let git = which::which("git").map_err(|e| SnapshotError::CommandFailed {
            command: "git".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            git_dir: absolute(repo.git_dir())?,
            objects_dir: absolute(&repo.common_dir().join("objects"))?,
            work_tree: absolute(&work_tree)?,
            git,
        })
    }

    /// Top of the repository's working tree
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Resolve `reference` to a full commit id
    pub fn resolve(&self, reference: &str) -> Result<String> {
        let unresolvable = |reason: String| SnapshotError::UnresolvableRef {
            reference: reference.to_string(),
            reason,
        };
        let repo = gix::open(&self.git_dir).map_err(|e| unresolvable(e.to_string()))?;
        let spec = format!("{reference}^{{commit}}");
        let id = repo
            .rev_parse_single(spec.as_str())
            .map_err(|e| unresolvable(e.to_string()))?;
        Ok(id.detach().to_string())
    }

    /// Write an archive of `reference` to `destination`, every entry under `prefix/`
    pub async fn archive(&self, reference: &str, destination: &Path, prefix: &str) -> Result<()> {
        let format = archive_format(destination).ok_or_else(|| SnapshotError::UnsupportedArchive {
            path: destination.to_path_buf(),
        })?;
        let commit = self.resolve(reference)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        let output = absolute(destination)?;

        log::info!(
            "Archiving {} ({}) to {}",
            reference,
            &commit[..12.min(commit.len())],
            output.display()
        );
        self.git(
            &self.work_tree,
            &[
                "archive",
                &format!("--format={format}"),
                &format!("--prefix={prefix}"),
                "-o",
                &output.display().to_string(),
                &commit,
            ],
        )
        .await
    }

    /// Materialize the tree of `reference` in `destination`.
    ///
    /// The new repository borrows the original object store through
    /// `objects/info/alternates` and is hard reset to the resolved commit.
    pub async fn checkout(&self, reference: &str, destination: &Path) -> Result<()> {
        let commit = self.resolve(reference)?;
        std::fs::create_dir_all(destination)?;
        let destination = absolute(destination)?;

        self.git(&destination, &["init", "-q", "."]).await?;
        let info = destination.join(".git").join("objects").join("info");
        std::fs::create_dir_all(&info)?;
        std::fs::write(
            info.join("alternates"),
            format!("{}\n", self.objects_dir.display()),
        )?;

        log::info!(
            "Checking out {} ({}) into {}",
            reference,
            &commit[..12.min(commit.len())],
            destination.display()
        );
        self.git(&destination, &["reset", "-q", "--hard", &commit]).await
    }

    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.git)
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| SnapshotError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(SnapshotError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
