//! Dockerfile generation from environment descriptors.
//!
//! Output depends only on the descriptor (and, for manifest-derived
//! environments, the CI manifest contents). Package lists are emitted in
//! lexicographic order so regenerating yields byte-identical Dockerfiles.

use crate::catalog::{EnvironmentDescriptor, Hook, PackageFamily};
use crate::error::ManifestError;
use crate::manifest::{self, CiManifest};
use crate::shell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Directory inside the image where signing keys are staged
const KEY_STAGING_DIR: &str = "/tmp/apt-keys";

/// One image-build instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `FROM <image>`
    From(String),
    /// `RUN <shell command>`
    Run(String),
    /// `ENV <key>=<value>`
    Env {
        /// Variable name
        key: String,
        /// Variable value
        value: String,
    },
    /// `ADD <src> <dest>`
    Add {
        /// File or URL
        src: String,
        /// Destination path in the image
        dest: String,
    },
}

impl Instruction {
    /// `FROM` instruction
    pub fn base(image: impl Into<String>) -> Self {
        Instruction::From(image.into())
    }

    /// `RUN` instruction
    pub fn run(command: impl Into<String>) -> Self {
        Instruction::Run(command.into())
    }

    /// `ENV` instruction
    pub fn env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Instruction::Env {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `ADD` instruction
    pub fn add(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Instruction::Add {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From(image) => write!(f, "FROM {image}"),
            Instruction::Run(command) => write!(f, "RUN {command}"),
            Instruction::Env { key, value } => write!(f, "ENV {key}={value}"),
            Instruction::Add { src, dest } => write!(f, "ADD {src} {dest}"),
        }
    }
}

/// Ordered instruction sequence for one environment image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DockerImageSpec {
    instructions: Vec<Instruction>,
}

impl DockerImageSpec {
    /// Rendered lines, one per instruction
    pub fn lines(&self) -> Vec<String> {
        self.instructions.iter().map(ToString::to_string).collect()
    }

    fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }
}

impl fmt::Display for DockerImageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

fn package_list<'a>(packages: impl IntoIterator<Item = &'a String>) -> String {
    packages
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn apt_install(packages: &str) -> Instruction {
    Instruction::run(format!("apt-get update && apt-get install -y {packages}"))
}

/// Turns descriptors into [`DockerImageSpec`]s
#[derive(Debug, Clone)]
pub struct DockerfileGenerator {
    ci_manifest: PathBuf,
}

impl DockerfileGenerator {
    /// Generator reading manifest-derived environments from `ci_manifest`
    pub fn new(ci_manifest: impl Into<PathBuf>) -> Self {
        Self {
            ci_manifest: ci_manifest.into(),
        }
    }

    /// Generate the image spec for `descriptor`
    pub fn generate(
        &self,
        descriptor: &EnvironmentDescriptor,
    ) -> Result<DockerImageSpec, ManifestError> {
        let manifest = match descriptor.family {
            PackageFamily::CiManifest => Some(manifest::load(&self.ci_manifest)?),
            _ => None,
        };
        Ok(generate_with(descriptor, manifest.as_ref()))
    }
}

/// Generate the image spec for `descriptor` with an already loaded manifest
pub fn generate_with(
    descriptor: &EnvironmentDescriptor,
    manifest: Option<&CiManifest>,
) -> DockerImageSpec {
    let mut spec = DockerImageSpec::default();
    spec.push(Instruction::base(&descriptor.base_image));

    for hook in &descriptor.hooks {
        if let Hook::Prepend(instruction) = hook {
            spec.push(instruction.clone());
        }
    }

    let packages = package_list(&descriptor.packages);
    match &descriptor.family {
        PackageFamily::Yum { tool } => {
            if !packages.is_empty() {
                spec.push(Instruction::run(format!(
                    "{tool} install -y {packages} && {tool} clean all"
                )));
            }
        }
        PackageFamily::Apt => {
            if !packages.is_empty() {
                spec.push(apt_install(&packages));
            }
        }
        PackageFamily::Zypper => {
            spec.push(Instruction::run("zypper --non-interactive refresh"));
            spec.push(Instruction::run("zypper --non-interactive update"));
            if !packages.is_empty() {
                spec.push(Instruction::run(format!(
                    "zypper --non-interactive install {packages}"
                )));
            }
        }
        PackageFamily::CiManifest => {
            if let Some(manifest) = manifest {
                push_manifest_sources(&mut spec, manifest);
                let packages =
                    package_list(descriptor.packages.iter().chain(&manifest.packages));
                if !packages.is_empty() {
                    spec.push(apt_install(&packages));
                }
            }
        }
    }

    for hook in &descriptor.hooks {
        if let Hook::Append(instruction) = hook {
            spec.push(instruction.clone());
        }
    }

    spec
}

/// Stage signing keys, then register every repository in one layer
fn push_manifest_sources(spec: &mut DockerImageSpec, manifest: &CiManifest) {
    if manifest.sources.is_empty() {
        return;
    }

    let mut steps = Vec::new();
    for (index, url) in manifest
        .sources
        .iter()
        .filter_map(|source| source.key_url.as_deref())
        .enumerate()
    {
        let staged = format!("{KEY_STAGING_DIR}/{index}.asc");
        spec.push(Instruction::add(url, &staged));
        steps.push(format!("apt-key add {staged}"));
    }
    for source in &manifest.sources {
        steps.push(format!("add-apt-repository -y {}", shell::quote(&source.line)));
    }
    spec.push(Instruction::run(steps.join(" && ")));
}
