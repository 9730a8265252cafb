//! Package build pipeline.
//!
//! Selects a packaging strategy from the environment's family, prepares an
//! ephemeral workspace from a committed revision, runs the build inside the
//! environment image and relocates the resulting packages.
//!
//! # Module Structure
//!
//! - `rpm` - `rpmbuild` from a spec file and a source archive
//! - `deb` - `debian/rules` from a checkout
//! - `ci` - Replay of the CI manifest's script
//! - `privdrop` - Entry point that switches to the invoking user
//! - `workspace` - Ephemeral workspace with elevated cleanup
//! - `artifacts` - Discovery and relocation of built packages

pub mod artifacts;
mod ci;
mod deb;
pub mod privdrop;
mod rpm;
pub mod workspace;

pub use ci::render_script;
pub use deb::install_packaging;
pub use rpm::{RpmSpec, archive_prefix};

use crate::catalog::{EnvironmentDescriptor, PackageFamily};
use crate::config::{Identity, ProjectLayout};
use crate::container::{self, ContainerEngine, ContainerInvocation};
use crate::error::{PackagingError, Result};
use crate::snapshot::SourceSnapshotter;
use privdrop::DropPlan;
use std::fmt;
use std::path::{Path, PathBuf};
use workspace::SnapshotWorkspace;

/// Mount point of the workspace inside packaging containers
pub const CONTAINER_WORKSPACE: &str = "/build";

/// Entry point script name inside the workspace
const ENTRY_POINT: &str = "entrypoint.sh";

/// Revision packaged when none is given
pub const DEFAULT_REFERENCE: &str = "HEAD";

/// How an environment turns a revision into packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'d> {
    /// rpmbuild with the given spec file
    Rpm(&'d Path),
    /// debian/rules with the given packaging directory
    Deb(&'d Path),
    /// CI manifest script replay
    CiScript,
}

impl<'d> Strategy<'d> {
    /// Strategy for `descriptor`, or `None` when it cannot package
    pub fn select(descriptor: &'d EnvironmentDescriptor) -> Option<Self> {
        let spec = descriptor.packaging_spec.as_deref();
        match (&descriptor.family, spec) {
            (PackageFamily::Yum { .. } | PackageFamily::Zypper, Some(spec)) => {
                Some(Strategy::Rpm(spec))
            }
            (PackageFamily::Apt, Some(spec)) => Some(Strategy::Deb(spec)),
            (PackageFamily::CiManifest, _) => Some(Strategy::CiScript),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Rpm(_) => write!(f, "rpm"),
            Strategy::Deb(_) => write!(f, "deb"),
            Strategy::CiScript => write!(f, "ci-script"),
        }
    }
}

/// Result of packaging one environment within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Packages relocated to the output directory
    Built(Vec<PathBuf>),
    /// Environment skipped, with the reason
    Skipped(String),
}

/// Per-environment entry of a batch report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Canonical environment name
    pub environment: String,
    /// What happened
    pub outcome: PackageOutcome,
}

/// Packages a committed revision for one or more environments
pub struct PackageBuildPipeline<'a, E> {
    engine: &'a E,
    layout: &'a ProjectLayout,
    identity: Identity,
    reference: &'a str,
    run_shell: bool,
}

impl<'a, E: ContainerEngine> PackageBuildPipeline<'a, E> {
    /// Pipeline packaging `HEAD` as the current user
    pub fn new(engine: &'a E, layout: &'a ProjectLayout) -> Self {
        Self {
            engine,
            layout,
            identity: Identity::current(),
            reference: DEFAULT_REFERENCE,
            run_shell: false,
        }
    }

    /// Package `reference` instead of `HEAD`
    pub fn with_reference(mut self, reference: &'a str) -> Self {
        self.reference = reference;
        self
    }

    /// Drop to `identity` instead of the current user
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Open an interactive shell in the prepared workspace instead of building
    pub fn with_run_shell(mut self, run_shell: bool) -> Self {
        self.run_shell = run_shell;
        self
    }

    /// Package one environment
    pub async fn package(&self, descriptor: &EnvironmentDescriptor) -> Result<Vec<PathBuf>> {
        let strategy = Strategy::select(descriptor).ok_or_else(|| {
            PackagingError::UnsupportedPackagingKind {
                environment: descriptor.name.clone(),
            }
        })?;
        log::info!(
            "Packaging {} for {} using {}",
            self.reference,
            descriptor.name,
            strategy
        );

        match strategy {
            Strategy::Rpm(spec) => rpm::package(self, descriptor, spec).await,
            Strategy::Deb(dir) => deb::package(self, descriptor, dir).await,
            Strategy::CiScript => ci::package(self, descriptor).await,
        }
    }

    /// Package every environment in order.
    ///
    /// Environments without a packaging strategy are reported as skipped;
    /// any other failure stops the batch.
    pub async fn package_all(
        &self,
        descriptors: &[&EnvironmentDescriptor],
    ) -> Result<Vec<PackageReport>> {
        let mut reports = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let outcome = match self.package(descriptor).await {
                Ok(artifacts) => PackageOutcome::Built(artifacts),
                Err(e) if e.is_skippable() => {
                    log::warn!("Skipping {}: {}", descriptor.name, e);
                    PackageOutcome::Skipped(e.to_string())
                }
                Err(e) => return Err(e),
            };
            reports.push(PackageReport {
                environment: descriptor.name.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    fn snapshotter(&self) -> Result<SourceSnapshotter> {
        SourceSnapshotter::open(&self.layout.root)
    }

    fn output_dir(&self, descriptor: &EnvironmentDescriptor) -> PathBuf {
        self.layout.output_dir.join(&descriptor.name)
    }

    /// Run `plan` in the environment image with the workspace mounted.
    ///
    /// Returns `false` when a shell was opened instead of building.
    async fn launch(
        &self,
        descriptor: &EnvironmentDescriptor,
        workspace: &SnapshotWorkspace,
        workdir: &str,
        plan: &DropPlan,
    ) -> Result<bool> {
        plan.write_to(&workspace.path().join(ENTRY_POINT))?;
        if self.run_shell {
            self.shell(descriptor, workspace).await?;
            return Ok(false);
        }

        let image = container::image_id(self.engine, &descriptor.image_tag()).await?;
        let invocation = ContainerInvocation::builder(image)
            .hostname(&descriptor.name)
            .mount(workspace.path(), CONTAINER_WORKSPACE)
            .workdir(workdir)
            .env("TMPDIR", format!("{CONTAINER_WORKSPACE}/tmp"))
            .command(["sh".to_string(), format!("{CONTAINER_WORKSPACE}/{ENTRY_POINT}")])
            .build();
        container::run(self.engine, &invocation).await?;
        Ok(true)
    }

    /// Interactive root shell in the prepared workspace
    async fn shell(
        &self,
        descriptor: &EnvironmentDescriptor,
        workspace: &SnapshotWorkspace,
    ) -> Result<()> {
        let image = container::image_id(self.engine, &descriptor.image_tag()).await?;
        let invocation = ContainerInvocation::builder(image)
            .hostname(&descriptor.name)
            .mount(workspace.path(), CONTAINER_WORKSPACE)
            .workdir(CONTAINER_WORKSPACE)
            .env("TMPDIR", format!("{CONTAINER_WORKSPACE}/tmp"))
            .interactive(true)
            .command(["bash"])
            .build();
        container::run(self.engine, &invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_strategy_follows_family() {
        let catalog = Catalog::builtin().unwrap();
        let strategy = |name: &str| Strategy::select(catalog.get(name).unwrap()).map(|s| s.to_string());

        assert_eq!(strategy("centos7").as_deref(), Some("rpm"));
        assert_eq!(strategy("fc25").as_deref(), Some("rpm"));
        assert_eq!(strategy("opensuse423").as_deref(), Some("rpm"));
        assert_eq!(strategy("debian9").as_deref(), Some("deb"));
        assert_eq!(strategy("ubuntu1604").as_deref(), Some("deb"));
        assert_eq!(strategy("travis").as_deref(), Some("ci-script"));
    }

    #[test]
    fn test_family_without_spec_has_no_strategy() {
        let descriptor = EnvironmentDescriptor::builder(
            "bare",
            "debian:stretch",
            PackageFamily::Apt,
            crate::catalog::BuildSystem::Make,
        )
        .build();
        assert_eq!(Strategy::select(&descriptor), None);
    }
}
