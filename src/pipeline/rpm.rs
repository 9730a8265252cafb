//! RPM packaging strategy.
//!
//! The spec file's `Version:` must match the project version before anything
//! else happens. The source archive is named after the spec's `Source0:`
//! and built from a committed revision, never the working tree.

use super::privdrop::{DropPlan, Phase};
use super::workspace::SnapshotWorkspace;
use super::{CONTAINER_WORKSPACE, PackageBuildPipeline, artifacts};
use crate::catalog::EnvironmentDescriptor;
use crate::container::ContainerEngine;
use crate::error::{PackagingError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*Version\s*:\s*(\S+)").expect("Version regex is valid")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*Name\s*:\s*(\S+)").expect("Name regex is valid"));

static SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*Source0?\s*:\s*(\S+)").expect("Source regex is valid")
});

/// Archive suffixes understood by `git archive`, longest first
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar", ".zip"];

/// rpmbuild tree under the workspace
const TOPDIR: &str = "rpmbuild";

/// Fields read from an RPM spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmSpec {
    /// `Name:` if present
    pub name: Option<String>,
    /// `Version:`
    pub version: String,
    /// `Source0:` (or `Source:`) as written, macros unexpanded
    pub source: String,
}

impl RpmSpec {
    /// Parse the fields the pipeline needs
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let field = |re: &Regex| re.captures(text).map(|caps| caps[1].to_string());
        let missing = |field: &str| PackagingError::MissingField {
            path: path.to_path_buf(),
            field: field.to_string(),
        };

        Ok(Self {
            name: field(&NAME_RE),
            version: field(&VERSION_RE).ok_or_else(|| missing("Version"))?,
            source: field(&SOURCE_RE).ok_or_else(|| missing("Source0"))?,
        })
    }

    /// Read and parse a spec file
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Fail unless the spec declares `project_version`
    pub fn ensure_version(&self, project_version: &str) -> Result<()> {
        if self.version != project_version {
            return Err(PackagingError::VersionMismatch {
                spec_version: self.version.clone(),
                project_version: project_version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Source archive file name with version and name macros expanded
    pub fn source_file(&self) -> String {
        let mut expanded = self
            .source
            .replace("%{version}", &self.version)
            .replace("%version", &self.version);
        if let Some(name) = &self.name {
            expanded = expanded.replace("%{name}", name).replace("%name", name);
        }
        match expanded.rsplit_once('/') {
            Some((_, file)) => file.to_string(),
            None => expanded,
        }
    }
}

/// Directory prefix inside the archive: the file name minus its archive suffix
pub fn archive_prefix(file: &str) -> &str {
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| file.strip_suffix(suffix))
        .unwrap_or(file)
}

pub(super) async fn package<E: ContainerEngine>(
    pipeline: &PackageBuildPipeline<'_, E>,
    descriptor: &EnvironmentDescriptor,
    spec_path: &Path,
) -> Result<Vec<PathBuf>> {
    let spec_path = pipeline.layout.resolve(spec_path);
    let spec = RpmSpec::read(&spec_path)?;
    spec.ensure_version(&pipeline.layout.project_version()?)?;

    let snapshotter = pipeline.snapshotter()?;
    let workspace = SnapshotWorkspace::create(pipeline.engine.elevation())?;
    let topdir = workspace.path().join(TOPDIR);
    for dir in ["BUILD", "RPMS", "SOURCES", "SPECS", "SRPMS"] {
        std::fs::create_dir_all(topdir.join(dir))?;
    }

    let source_file = spec.source_file();
    snapshotter
        .archive(
            pipeline.reference,
            &topdir.join("SOURCES").join(&source_file),
            archive_prefix(&source_file),
        )
        .await?;

    let spec_name = spec_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project.spec".to_string());
    std::fs::copy(&spec_path, topdir.join("SPECS").join(&spec_name))?;

    let plan = DropPlan::new(pipeline.identity.clone(), CONTAINER_WORKSPACE).then(
        Phase::unprivileged([
            "rpmbuild".to_string(),
            "--define".to_string(),
            format!("_topdir {CONTAINER_WORKSPACE}/{TOPDIR}"),
            "-ba".to_string(),
            format!("{CONTAINER_WORKSPACE}/{TOPDIR}/SPECS/{spec_name}"),
        ]),
    );

    let built = pipeline
        .launch(descriptor, &workspace, CONTAINER_WORKSPACE, &plan)
        .await?;
    let artifacts = if built {
        artifacts::harvest(
            &descriptor.name,
            &[topdir.join("RPMS"), topdir.join("SRPMS")],
            "rpm",
            &pipeline.output_dir(descriptor),
        )?
    } else {
        Vec::new()
    };

    workspace.close()?;
    Ok(artifacts)
}
