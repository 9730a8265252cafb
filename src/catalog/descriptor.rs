//! Environment descriptor model.
//!
//! A descriptor is an immutable configuration record. Distro variants are
//! expressed by composing records with [`DescriptorBuilder`], never by
//! subclassing; the per-family image strategy is picked by matching on
//! [`PackageFamily`].

use crate::dockerfile::Instruction;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Package manager family of an environment's base image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageFamily {
    /// yum or dnf, named by `tool`
    Yum {
        /// Package tool binary (`yum` or `dnf`)
        tool: String,
    },
    /// apt-get
    Apt,
    /// zypper
    Zypper,
    /// Sources and packages come from the CI manifest at generation time
    CiManifest,
}

/// Build system used by the incremental driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
    /// CMake generating Unix Makefiles
    Make,
    /// CMake generating build.ninja
    Ninja,
}

impl BuildSystem {
    /// File whose presence means the build directory is configured
    pub fn marker(self) -> &'static str {
        match self {
            BuildSystem::Make => "Makefile",
            BuildSystem::Ninja => "build.ninja",
        }
    }

    /// CMake generator name
    pub fn generator(self) -> &'static str {
        match self {
            BuildSystem::Make => "Unix Makefiles",
            BuildSystem::Ninja => "Ninja",
        }
    }

    /// Incremental build tool
    pub fn tool(self) -> &'static str {
        match self {
            BuildSystem::Make => "make",
            BuildSystem::Ninja => "ninja",
        }
    }
}

/// Extra image-construction step attached to one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    /// Emitted right after the base-image instruction
    Prepend(Instruction),
    /// Emitted after the package installation instructions
    Append(Instruction),
}

/// Declarative description of one target distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// Canonical name, unique across the catalog
    pub name: String,
    /// Alternative tokens resolving to this descriptor
    pub aliases: BTreeSet<String>,
    /// Base image reference for `FROM`
    pub base_image: String,
    /// Package manager family
    pub family: PackageFamily,
    /// Packages installed into the image
    pub packages: BTreeSet<String>,
    /// Build system for incremental builds
    pub build_system: BuildSystem,
    /// Packaging spec (rpm `.spec` file or debian directory), relative to the project root
    pub packaging_spec: Option<PathBuf>,
    /// Whether image builds receive the host HTTP proxy
    pub proxy_eligible: bool,
    /// Extra image-construction steps
    pub hooks: Vec<Hook>,
}

impl EnvironmentDescriptor {
    /// Start composing a descriptor
    pub fn builder(
        name: impl Into<String>,
        base_image: impl Into<String>,
        family: PackageFamily,
        build_system: BuildSystem,
    ) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: EnvironmentDescriptor {
                name: name.into(),
                aliases: BTreeSet::new(),
                base_image: base_image.into(),
                family,
                packages: BTreeSet::new(),
                build_system,
                packaging_spec: None,
                proxy_eligible: false,
                hooks: Vec::new(),
            },
        }
    }

    /// Image tag used for this environment
    pub fn image_tag(&self) -> String {
        format!("{}/{}", crate::container::IMAGE_NAMESPACE, self.name)
    }

    /// Persistent incremental build directory under `project_root`
    pub fn build_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(format!("build-{}", self.name))
    }
}

/// Composition helper producing an [`EnvironmentDescriptor`]
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: EnvironmentDescriptor,
}

impl DescriptorBuilder {
    /// Add aliases
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .aliases
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add packages to the install set
    pub fn packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    /// Set the packaging spec path
    pub fn packaging(mut self, spec: impl Into<PathBuf>) -> Self {
        self.descriptor.packaging_spec = Some(spec.into());
        self
    }

    /// Pass the host proxy to image builds
    pub fn proxy(mut self) -> Self {
        self.descriptor.proxy_eligible = true;
        self
    }

    /// Emit `instruction` right after `FROM`
    pub fn prepend(mut self, instruction: Instruction) -> Self {
        self.descriptor.hooks.push(Hook::Prepend(instruction));
        self
    }

    /// Emit `instruction` after package installation
    pub fn append(mut self, instruction: Instruction) -> Self {
        self.descriptor.hooks.push(Hook::Append(instruction));
        self
    }

    /// Finish composition
    pub fn build(self) -> EnvironmentDescriptor {
        self.descriptor
    }
}
