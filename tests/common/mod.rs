//! Shared fixtures for integration tests.

#![allow(dead_code)]

use distro_build::config::Identity;
use distro_build::container::{Attach, ContainerEngine};
use distro_build::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(Vec<String>),
    Capture(Vec<String>),
    Replace(Vec<String>),
}

impl Call {
    pub fn args(&self) -> &[String] {
        match self {
            Call::Execute(args) | Call::Capture(args) | Call::Replace(args) => args,
        }
    }
}

type Hook = Box<dyn Fn(&[String]) + Send + Sync>;

/// Engine that records every call and answers captures from canned output
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    captures: HashMap<String, String>,
    on_execute: Option<Hook>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer captures whose first argument is `subcommand` with `output`
    pub fn with_capture(mut self, subcommand: &str, output: &str) -> Self {
        self.captures
            .insert(subcommand.to_string(), output.to_string());
        self
    }

    /// Answer `inspect` with a single image id
    pub fn with_image(self, id: &str) -> Self {
        self.with_capture("inspect", &format!(r#"[{{"Id": "{id}"}}]"#))
    }

    /// Run `hook` for every `execute` and `replace`, after recording it
    pub fn on_execute(mut self, hook: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_execute = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn hook(&self, args: &[String]) {
        if let Some(hook) = &self.on_execute {
            hook(args);
        }
    }
}

impl ContainerEngine for FakeEngine {
    async fn execute(&self, args: &[String], _attach: Attach) -> Result<()> {
        self.record(Call::Execute(args.to_vec()));
        self.hook(args);
        Ok(())
    }

    async fn capture(&self, args: &[String]) -> Result<String> {
        self.record(Call::Capture(args.to_vec()));
        Ok(args
            .first()
            .and_then(|subcommand| self.captures.get(subcommand))
            .cloned()
            .unwrap_or_default())
    }

    fn replace(&self, args: &[String]) -> Result<i32> {
        self.record(Call::Replace(args.to_vec()));
        self.hook(args);
        Ok(0)
    }

    fn elevation(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Value following `flag` in an argument vector
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Host side of the mount whose container side is `container`
pub fn mount_source(args: &[String], container: &str) -> Option<PathBuf> {
    args.windows(2)
        .filter(|pair| pair[0] == "-v")
        .find_map(|pair| {
            let (host, rest) = pair[1].split_once(':')?;
            (rest == container || rest.starts_with(&format!("{container}:")))
                .then(|| PathBuf::from(host))
        })
}

pub fn identity() -> Identity {
    Identity {
        uid: 1000,
        gid: 1000,
        user: "dev".to_string(),
        group: "dev".to_string(),
    }
}

pub fn has_git() -> bool {
    which::which("git").is_ok()
}

/// Run git in `dir` with a fixed identity
pub fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.org"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// Initialize a repository in `dir` with `files` committed
pub fn init_repo(dir: &Path, files: &[(&str, &str)]) {
    git(dir, &["init", "-q"]);
    for (path, content) in files {
        let path = dir.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", "initial"]);
}
