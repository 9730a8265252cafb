//! Project layout and the external files consumed from it.

use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};

/// Default name of the file declaring the canonical project version
pub const VERSION_FILE: &str = "VERSION";

/// Default CI manifest name
pub const CI_MANIFEST: &str = ".travis.yml";

/// Default host proxy configuration file
pub const PROXY_FILE: &str = "/etc/sysconfig/docker";

/// Default artifact destination, relative to the project root
pub const OUTPUT_DIR: &str = "packages";

/// Resolved locations of everything the tool reads or writes on the host
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Top of the working tree
    pub root: PathBuf,
    /// Canonical version file
    pub version_file: PathBuf,
    /// CI manifest
    pub ci_manifest: PathBuf,
    /// Host proxy configuration (may not exist)
    pub proxy_file: PathBuf,
    /// Artifact destination
    pub output_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout with every path at its default under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            version_file: root.join(VERSION_FILE),
            ci_manifest: root.join(CI_MANIFEST),
            proxy_file: PathBuf::from(PROXY_FILE),
            output_dir: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Resolve `path` against the project root unless absolute
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Canonical project version
    pub fn project_version(&self) -> Result<String> {
        read_project_version(&self.version_file)
    }

    /// HTTP proxy from the host configuration, if any
    pub fn proxy(&self) -> Option<String> {
        read_proxy(&self.proxy_file)
    }
}

/// Read the version file, trimmed
pub fn read_project_version(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BuildError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read version file {}: {}", path.display(), e),
        ))
    })?;
    Ok(content.trim().to_string())
}

/// Extract the proxy URL from configuration text.
///
/// Takes the first line mentioning `HTTP_PROXY` and returns whatever sits
/// between its first pair of double quotes.
pub fn parse_proxy(text: &str) -> Option<String> {
    let line = text
        .lines()
        .find(|line| line.to_ascii_uppercase().contains("HTTP_PROXY"))?;
    let mut parts = line.split('"');
    parts.next()?;
    let value = parts.next()?;
    // An opening quote without a closing one yields no pair
    parts.next()?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Read the proxy file; a missing or unreadable file means no proxy
pub fn read_proxy(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_proxy(&text),
        Err(e) => {
            log::debug!("No proxy configuration at {}: {}", path.display(), e);
            None
        }
    }
}

/// Invoking user's identity, used for container user mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User id
    pub uid: u32,
    /// Group id
    pub gid: u32,
    /// Login name
    pub user: String,
    /// Primary group name
    pub group: String,
}

impl Identity {
    /// Identity of the current process
    #[cfg(unix)]
    pub fn current() -> Self {
        let uid = users::get_current_uid();
        let gid = users::get_current_gid();
        let user = users::get_current_username()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("u{uid}"));
        let group = users::get_current_groupname()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("g{gid}"));
        Self {
            uid,
            gid,
            user,
            group,
        }
    }

    /// Identity of the current process
    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self {
            uid: 1000,
            gid: 1000,
            user: "builder".to_string(),
            group: "builder".to_string(),
        }
    }
}
