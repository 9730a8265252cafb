//! Error types for distro_build operations.
//!
//! Every concern gets its own enum; all of them fold into [`BuildError`] so
//! callers can propagate with `?` and still match on the precise failure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for distro_build operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for all distro_build operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// Environment catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Packaging pipeline errors
    #[error("Packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// Container engine errors
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Source snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Ephemeral workspace errors
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// CI manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal errors
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Environment catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Token matches neither a canonical name nor an alias
    #[error("Unknown environment '{token}'")]
    UnknownEnvironment {
        /// Token as given on the command line
        token: String,
    },

    /// Name or alias registered twice, or shadowing the wildcard
    #[error("Environment token '{token}' is registered more than once")]
    Conflict {
        /// Offending token
        token: String,
    },
}

/// Packaging pipeline errors
#[derive(Error, Debug)]
pub enum PackagingError {
    /// Packaging spec declares a different version than the project
    #[error(
        "Packaging spec declares version '{spec_version}' but the project version is '{project_version}'"
    )]
    VersionMismatch {
        /// Version declared in the packaging spec
        spec_version: String,
        /// Canonical project version
        project_version: String,
    },

    /// Required field missing from a packaging spec
    #[error("Packaging spec {path} has no '{field}' field")]
    MissingField {
        /// Spec file path
        path: PathBuf,
        /// Field name
        field: String,
    },

    /// Environment has no packaging strategy
    #[error("Environment '{environment}' does not support packaging")]
    UnsupportedPackagingKind {
        /// Canonical environment name
        environment: String,
    },

    /// Build succeeded but produced nothing to collect
    #[error("No artifacts for '{environment}' found under {dir}")]
    NoArtifacts {
        /// Canonical environment name
        environment: String,
        /// Directory that was searched
        dir: PathBuf,
    },
}

/// Container engine errors
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Engine exited non-zero
    #[error("'{command}' failed with exit code {code}")]
    EngineFailure {
        /// Command line that failed
        command: String,
        /// Exit code (-1 when terminated by a signal)
        code: i32,
    },

    /// Engine could not be started at all
    #[error("Failed to start '{command}': {reason}")]
    Spawn {
        /// Command line that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Inspect output did not yield an image id
    #[error("Cannot resolve image '{image}': {reason}")]
    Inspect {
        /// Image name or id
        image: String,
        /// Reason for the error
        reason: String,
    },
}

/// Source snapshot errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Revision cannot be resolved to a commit
    #[error("Cannot resolve reference '{reference}': {reason}")]
    UnresolvableRef {
        /// Revision as given
        reference: String,
        /// Reason for the error
        reason: String,
    },

    /// Path is not inside a git repository
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Path that was searched
        path: PathBuf,
    },

    /// A git subprocess failed
    #[error("'{command}' failed: {reason}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Destination extension maps to no archive format
    #[error("Unsupported archive format for {path}")]
    UnsupportedArchive {
        /// Destination path
        path: PathBuf,
    },
}

/// Ephemeral workspace errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Neither ordinary nor elevated removal succeeded
    #[error("Failed to remove workspace {path}: {reason}")]
    CleanupFailed {
        /// Workspace path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CI manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file does not exist
    #[error("CI manifest not found at {path}")]
    Missing {
        /// Expected path
        path: PathBuf,
    },

    /// A required key is missing or has the wrong type
    #[error("CI manifest key '{key}': {reason}")]
    Format {
        /// Dotted key path
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// File is not valid YAML
    #[error("CI manifest is not valid YAML: {reason}")]
    Parse {
        /// Parser message
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl BuildError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BuildError::Catalog(CatalogError::UnknownEnvironment { .. }) => vec![
                "Use a canonical environment name, a registered alias, or 'all'".to_string(),
            ],
            BuildError::Packaging(PackagingError::VersionMismatch { project_version, .. }) => {
                vec![
                    format!("Update the packaging spec Version to {}", project_version),
                    "Or correct the project VERSION file".to_string(),
                ]
            }
            BuildError::Container(ContainerError::Inspect { .. }) => vec![
                "Build the environment image first: distro-build build-images <ENV>".to_string(),
            ],
            BuildError::Container(ContainerError::Spawn { .. }) => vec![
                "Check that docker is installed and the daemon is running".to_string(),
                "Override the engine command with --engine if sudo is not used".to_string(),
            ],
            BuildError::Snapshot(SnapshotError::UnresolvableRef { .. }) => vec![
                "Verify the revision exists: git rev-parse <REV>".to_string(),
            ],
            BuildError::Workspace(WorkspaceError::CleanupFailed { path, .. }) => vec![format!(
                "Remove the leftover workspace manually: sudo rm -rf {}",
                path.display()
            )],
            BuildError::Manifest(_) => vec![
                "The CI manifest needs addons.apt.sources, addons.apt.packages and script"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether a batch may continue with the next environment after this error
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            BuildError::Packaging(PackagingError::UnsupportedPackagingKind { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unsupported_packaging_is_skippable() {
        let skip: BuildError = PackagingError::UnsupportedPackagingKind {
            environment: "centos7".to_string(),
        }
        .into();
        assert!(skip.is_skippable());

        let fatal: BuildError = PackagingError::VersionMismatch {
            spec_version: "1.2".to_string(),
            project_version: "1.3".to_string(),
        }
        .into();
        assert!(!fatal.is_skippable());
    }

    #[test]
    fn test_version_mismatch_suggests_project_version() {
        let err: BuildError = PackagingError::VersionMismatch {
            spec_version: "1.2".to_string(),
            project_version: "1.3".to_string(),
        }
        .into();
        assert!(err.recovery_suggestions()[0].contains("1.3"));
    }
}
