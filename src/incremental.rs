//! Incremental development builds in persistent per-environment directories.
//!
//! Each environment owns `build-<name>` at the top of the project. The
//! configure step runs only while the build system's marker file is absent,
//! so repeated invocations go straight to the incremental build tool.

use crate::catalog::EnvironmentDescriptor;
use crate::config::{Identity, ProjectLayout};
use crate::container::{self, ContainerEngine, ContainerInvocation};
use crate::error::Result;
use std::io::IsTerminal;
use std::path::Path;

/// Prefix marking a configuration definition
pub const DEFINITION_PREFIX: &str = "-D";

/// Free-form trailing arguments split into their three classes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArguments {
    /// Configuration definitions (`-DNAME=VALUE`), passed to configure
    pub definitions: Vec<String>,
    /// Environment assignments (`NAME=VALUE`), exported to configure
    pub environment: Vec<(String, String)>,
    /// Everything else, passed to the build tool
    pub passthrough: Vec<String>,
}

impl BuildArguments {
    /// Partition `args` preserving their relative order within each class
    pub fn partition<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut partitioned = Self::default();
        for arg in args {
            let arg = arg.into();
            if arg.starts_with(DEFINITION_PREFIX) {
                partitioned.definitions.push(arg);
            } else if let Some((key, value)) = arg.split_once('=') {
                partitioned
                    .environment
                    .push((key.to_string(), value.to_string()));
            } else {
                partitioned.passthrough.push(arg);
            }
        }
        partitioned
    }
}

/// True while the build directory has not been configured
pub fn needs_configure(descriptor: &EnvironmentDescriptor, project_root: &Path) -> bool {
    !descriptor
        .build_dir(project_root)
        .join(descriptor.build_system.marker())
        .exists()
}

/// Runs configure and build steps inside environment containers
pub struct IncrementalBuildDriver<'a, E> {
    engine: &'a E,
    layout: &'a ProjectLayout,
    identity: Identity,
    run_shell: bool,
}

impl<'a, E: ContainerEngine> IncrementalBuildDriver<'a, E> {
    /// Driver running as the current user
    pub fn new(engine: &'a E, layout: &'a ProjectLayout) -> Self {
        Self {
            engine,
            layout,
            identity: Identity::current(),
            run_shell: false,
        }
    }

    /// Map containers to `identity` instead of the current user
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Open an interactive shell in the build directory instead of building
    pub fn with_run_shell(mut self, run_shell: bool) -> Self {
        self.run_shell = run_shell;
        self
    }

    /// Invocation skeleton shared by configure, build and shell
    fn invocation(
        &self,
        descriptor: &EnvironmentDescriptor,
        environment: &[(String, String)],
        command: Vec<String>,
        interactive: bool,
    ) -> ContainerInvocation {
        let root = &self.layout.root;
        let build_dir = descriptor.build_dir(root);
        let mut builder = ContainerInvocation::builder(descriptor.image_tag())
            .read_only_root()
            .hostname(&descriptor.name)
            .mount(root, root)
            .workdir(&build_dir)
            .env("HOME", build_dir.display().to_string());
        for (key, value) in environment {
            builder = builder.env(key, value);
        }
        builder
            .user(self.identity.uid, self.identity.gid)
            .interactive(interactive)
            .command(command)
            .build()
    }

    /// `cmake -G <generator> <definitions...> <project-root>`
    pub fn configure_invocation(
        &self,
        descriptor: &EnvironmentDescriptor,
        args: &BuildArguments,
    ) -> ContainerInvocation {
        let mut command = vec![
            "cmake".to_string(),
            "-G".to_string(),
            descriptor.build_system.generator().to_string(),
        ];
        command.extend(args.definitions.iter().cloned());
        command.push(self.layout.root.display().to_string());
        self.invocation(descriptor, &args.environment, command, false)
    }

    /// `make <args...>` or `ninja <args...>`
    pub fn build_invocation(
        &self,
        descriptor: &EnvironmentDescriptor,
        args: &BuildArguments,
        interactive: bool,
    ) -> ContainerInvocation {
        let mut command = vec![descriptor.build_system.tool().to_string()];
        command.extend(args.passthrough.iter().cloned());
        self.invocation(descriptor, &[], command, interactive)
    }

    /// Interactive `bash` in the build directory
    pub fn shell_invocation(&self, descriptor: &EnvironmentDescriptor) -> ContainerInvocation {
        self.invocation(descriptor, &[], vec!["bash".to_string()], true)
    }

    /// Ensure the build directory exists and is configured
    pub async fn prepare(
        &self,
        descriptor: &EnvironmentDescriptor,
        args: &BuildArguments,
    ) -> Result<()> {
        let build_dir = descriptor.build_dir(&self.layout.root);
        if !build_dir.is_dir() {
            log::info!("Creating {}", build_dir.display());
            std::fs::create_dir_all(&build_dir)?;
        }
        if self.run_shell || !needs_configure(descriptor, &self.layout.root) {
            return Ok(());
        }

        log::info!("Configuring {} in {}", descriptor.name, build_dir.display());
        container::run(self.engine, &self.configure_invocation(descriptor, args)).await
    }

    /// Configure if needed and build every environment in order.
    ///
    /// A single environment hands the terminal to the container by replacing
    /// the current process; the returned value is its exit code when
    /// replacement is unavailable. Several environments are supervised one
    /// at a time and the result is `0` once all of them succeed.
    pub async fn run(
        &self,
        descriptors: &[&EnvironmentDescriptor],
        args: &[String],
    ) -> Result<i32> {
        let args = BuildArguments::partition(args.iter().cloned());

        if let [descriptor] = descriptors {
            self.prepare(descriptor, &args).await?;
            let invocation = if self.run_shell {
                self.shell_invocation(descriptor)
            } else {
                self.build_invocation(descriptor, &args, std::io::stdin().is_terminal())
            };
            return self.engine.replace(&invocation.to_args());
        }

        for descriptor in descriptors {
            self.prepare(descriptor, &args).await?;
            let invocation = if self.run_shell {
                self.shell_invocation(descriptor)
            } else {
                self.build_invocation(descriptor, &args, false)
            };
            log::info!("Building {}", descriptor.name);
            container::run(self.engine, &invocation).await?;
        }
        Ok(0)
    }
}
