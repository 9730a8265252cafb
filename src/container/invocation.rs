//! Container `run` invocations.
//!
//! An invocation is assembled once through [`InvocationBuilder`] and never
//! mutated afterwards; [`ContainerInvocation::to_args`] renders the engine
//! flags.

use std::path::PathBuf;

/// Host to container bind mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host path
    pub host: PathBuf,
    /// Path inside the container
    pub container: PathBuf,
    /// Mount read-only
    pub read_only: bool,
}

impl Mount {
    /// Flag value for `-v`
    pub fn to_flag(&self) -> String {
        let mut flag = format!("{}:{}", self.host.display(), self.container.display());
        if self.read_only {
            flag.push_str(":ro");
        }
        flag
    }
}

/// One fully specified `run` of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInvocation {
    image: String,
    mounts: Vec<Mount>,
    workdir: Option<PathBuf>,
    env: Vec<(String, String)>,
    user: Option<(u32, u32)>,
    hostname: Option<String>,
    command: Vec<String>,
    interactive: bool,
    read_only_root: bool,
}

impl ContainerInvocation {
    /// Start building an invocation of `image` (tag or content-addressed id)
    pub fn builder(image: impl Into<String>) -> InvocationBuilder {
        InvocationBuilder {
            invocation: ContainerInvocation {
                image: image.into(),
                mounts: Vec::new(),
                workdir: None,
                env: Vec::new(),
                user: None,
                hostname: None,
                command: Vec::new(),
                interactive: false,
                read_only_root: false,
            },
        }
    }

    /// Command vector
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Whether a terminal is attached
    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Engine arguments for this invocation
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];

        if self.interactive {
            args.push("-i".to_string());
            args.push("-t".to_string());
        }

        if self.read_only_root {
            args.push("--read-only".to_string());
            args.push("--tmpfs".to_string());
            args.push("/tmp".to_string());
        }

        if let Some(hostname) = &self.hostname {
            args.push("--hostname".to_string());
            args.push(hostname.clone());
        }

        for mount in &self.mounts {
            args.push("-v".to_string());
            args.push(mount.to_flag());
        }

        if let Some(workdir) = &self.workdir {
            args.push("-w".to_string());
            args.push(workdir.display().to_string());
        }

        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        if let Some((uid, gid)) = self.user {
            args.push("-u".to_string());
            args.push(format!("{uid}:{gid}"));
        }

        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Builder for [`ContainerInvocation`]
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    invocation: ContainerInvocation,
}

impl InvocationBuilder {
    /// Bind `host` at `container`
    pub fn mount(mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        self.invocation.mounts.push(Mount {
            host: host.into(),
            container: container.into(),
            read_only: false,
        });
        self
    }

    /// Bind `host` at `container`, read-only
    pub fn mount_ro(mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        self.invocation.mounts.push(Mount {
            host: host.into(),
            container: container.into(),
            read_only: true,
        });
        self
    }

    /// Working directory
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.invocation.workdir = Some(dir.into());
        self
    }

    /// Add an environment assignment
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.invocation.env.push((key.into(), value.into()));
        self
    }

    /// Run as `uid:gid`
    pub fn user(mut self, uid: u32, gid: u32) -> Self {
        self.invocation.user = Some((uid, gid));
        self
    }

    /// Container hostname
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.invocation.hostname = Some(hostname.into());
        self
    }

    /// Command vector
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a terminal
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.invocation.interactive = interactive;
        self
    }

    /// Mount the root filesystem read-only
    pub fn read_only_root(mut self) -> Self {
        self.invocation.read_only_root = true;
        self
    }

    /// Freeze the invocation
    pub fn build(self) -> ContainerInvocation {
        self.invocation
    }
}
