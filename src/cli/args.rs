//! Command line argument parsing and validation.
//!
//! Paths default to the conventional locations under the project root, which
//! itself defaults to the git work tree containing the current directory.

use crate::config::ProjectLayout;
use crate::container::DEFAULT_ENGINE;
use crate::error::Result;
use crate::pipeline::DEFAULT_REFERENCE;
use crate::snapshot::SourceSnapshotter;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build and package a project for a matrix of Linux distributions
#[derive(Parser, Debug)]
#[command(
    name = "distro-build",
    version,
    about = "Build and package a project for a matrix of Linux distributions",
    long_about = "Build and package a project inside per-distribution container images.

ENV is a canonical environment name, a registered alias, or 'all'.

Usage:
  distro-build build-images all
  distro-build make fc26 -DCMAKE_BUILD_TYPE=Debug -j8
  distro-build pkg centos7
  distro-build docker-gc"
)]
pub struct Args {
    /// Project root (defaults to the enclosing git work tree)
    #[arg(long, global = true, env = "DISTRO_BUILD_ROOT", value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// Container engine command line
    #[arg(long, global = true, env = "DISTRO_BUILD_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// File declaring the canonical project version, relative to the root
    #[arg(long, global = true, value_name = "FILE")]
    pub version_file: Option<PathBuf>,

    /// CI manifest, relative to the root
    #[arg(long, global = true, value_name = "FILE")]
    pub ci_manifest: Option<PathBuf>,

    /// Host container-engine configuration carrying HTTP_PROXY
    #[arg(long, global = true, env = "DISTRO_BUILD_PROXY_FILE", value_name = "FILE")]
    pub proxy_file: Option<PathBuf>,

    /// Directory receiving packages, relative to the root
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build environment images
    BuildImages {
        /// Environments to build
        #[arg(required = true, value_name = "ENV")]
        environments: Vec<String>,

        /// Do not attempt to pull newer base images
        #[arg(long)]
        no_pull: bool,
    },

    /// Configure and build incrementally in build-<ENV>
    Make {
        /// Environment to build in
        #[arg(value_name = "ENV")]
        environment: String,

        /// Open a shell in the build directory instead of building
        #[arg(long)]
        run_shell: bool,

        /// -D definitions, NAME=VALUE assignments and build tool arguments
        #[arg(
            value_name = "ARGS",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },

    /// Build distribution packages from a committed revision
    Pkg {
        /// Environment to package for
        #[arg(value_name = "ENV")]
        environment: String,

        /// Open a root shell in the prepared workspace instead of building
        #[arg(long)]
        run_shell: bool,

        /// Revision to package
        #[arg(long = "ref", value_name = "REV", default_value = DEFAULT_REFERENCE)]
        reference: String,
    },

    /// Remove exited containers and dangling images
    DockerGc,
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::BuildImages { .. } => "build-images",
            Command::Make { .. } => "make",
            Command::Pkg { .. } => "pkg",
            Command::DockerGc => "docker-gc",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.engine.trim().is_empty() {
            return Err("Container engine command is empty".to_string());
        }
        if let Command::Pkg { reference, .. } = &self.command
            && reference.trim().is_empty()
        {
            return Err("Revision to package is empty".to_string());
        }
        Ok(())
    }

    /// Project layout after applying overrides
    pub fn layout(&self) -> Result<ProjectLayout> {
        let root = match &self.project_root {
            Some(root) => root.clone(),
            None => {
                let cwd = std::env::current_dir()?;
                match SourceSnapshotter::open(&cwd) {
                    Ok(snapshotter) => snapshotter.work_tree().to_path_buf(),
                    Err(e) => {
                        log::debug!("Using {} as project root: {}", cwd.display(), e);
                        cwd
                    }
                }
            }
        };

        let mut layout = ProjectLayout::new(root);
        if let Some(path) = &self.version_file {
            layout.version_file = layout.resolve(path);
        }
        if let Some(path) = &self.ci_manifest {
            layout.ci_manifest = layout.resolve(path);
        }
        if let Some(path) = &self.proxy_file {
            layout.proxy_file = path.clone();
        }
        if let Some(path) = &self.output_dir {
            layout.output_dir = layout.resolve(path);
        }
        Ok(layout)
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    layout: ProjectLayout,
    engine: String,
}

impl RuntimeConfig {
    /// Build runtime configuration from parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
            layout: args.layout()?,
            engine: args.engine.clone(),
        })
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Project layout
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Container engine for this run
    pub fn engine(&self) -> Result<crate::container::DockerEngine> {
        crate::container::DockerEngine::new(&self.engine, self.output.clone())
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        let _ = self.output.info(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_passes_definitions_through() {
        let args = Args::try_parse_from([
            "distro-build",
            "make",
            "fc26",
            "-DCMAKE_BUILD_TYPE=Debug",
            "CC=clang",
            "-j8",
        ])
        .unwrap();
        match args.command {
            Command::Make {
                environment,
                run_shell,
                args,
            } => {
                assert_eq!(environment, "fc26");
                assert!(!run_shell);
                assert_eq!(args, vec!["-DCMAKE_BUILD_TYPE=Debug", "CC=clang", "-j8"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_pkg_defaults_to_head() {
        let args = Args::try_parse_from(["distro-build", "pkg", "centos7"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Pkg { ref reference, run_shell: false, .. } if reference == "HEAD"
        ));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_build_images_requires_environment() {
        assert!(Args::try_parse_from(["distro-build", "build-images"]).is_err());
        let args =
            Args::try_parse_from(["distro-build", "build-images", "all", "--no-pull"]).unwrap();
        assert!(matches!(args.command, Command::BuildImages { no_pull: true, .. }));
    }

    #[test]
    fn test_overrides_resolve_against_root() {
        let args = Args::try_parse_from([
            "distro-build",
            "--project-root",
            "/src/project",
            "--output-dir",
            "out",
            "--proxy-file",
            "/etc/default/docker",
            "docker-gc",
        ])
        .unwrap();
        let layout = args.layout().unwrap();
        assert_eq!(layout.root, PathBuf::from("/src/project"));
        assert_eq!(layout.output_dir, PathBuf::from("/src/project/out"));
        assert_eq!(layout.proxy_file, PathBuf::from("/etc/default/docker"));
        assert_eq!(layout.version_file, PathBuf::from("/src/project/VERSION"));
    }
}
