//! Privilege-drop entry point for packaging containers.
//!
//! A [`DropPlan`] is declarative: who to become and which phases to run at
//! which privilege level. [`DropPlan::render`] turns it into the small
//! `sh` entry point executed inside the container. The rendered order is
//! fixed: register the identity, then run phases, with unprivileged phases
//! switching credentials before the build tool starts.

use crate::config::Identity;
use crate::error::Result;
use crate::shell;
use std::path::Path;

/// One step of the in-container build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Run with the container's elevated identity
    pub privileged: bool,
    /// Command vector
    pub argv: Vec<String>,
}

impl Phase {
    /// Phase run under the invoking user's credentials
    pub fn unprivileged<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            privileged: false,
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Phase run as root
    pub fn privileged<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            privileged: true,
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }
}

/// Identity to register and the phases to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    identity: Identity,
    home: String,
    phases: Vec<Phase>,
}

impl DropPlan {
    /// Plan for `identity` with `home` as its home directory inside the container
    pub fn new(identity: Identity, home: impl Into<String>) -> Self {
        Self {
            identity,
            home: home.into(),
            phases: Vec::new(),
        }
    }

    /// Append a phase
    pub fn then(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Phases in execution order
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Render the entry point script
    pub fn render(&self) -> String {
        let Identity {
            uid,
            gid,
            user,
            group,
        } = &self.identity;

        let passwd = format!("{user}:x:{uid}:{gid}::{}:/bin/sh", self.home);
        let group_entry = format!("{group}:x:{gid}:");

        let mut script = String::from("#!/bin/sh\nset -e\n");
        script.push_str(&format!(
            "grep -q {} /etc/group || echo {} >> /etc/group\n",
            shell::quote(&format!("^{group}:")),
            shell::quote(&group_entry)
        ));
        script.push_str(&format!(
            "grep -q {} /etc/passwd || echo {} >> /etc/passwd\n",
            shell::quote(&format!("^{user}:")),
            shell::quote(&passwd)
        ));

        for phase in &self.phases {
            let command = shell::join(&phase.argv);
            if phase.privileged {
                script.push_str(&command);
            } else {
                script.push_str(&format!(
                    "runuser -u {} -g {} -- env HOME={} {}",
                    shell::quote(user),
                    shell::quote(group),
                    shell::quote(&self.home),
                    command
                ));
            }
            script.push('\n');
        }
        script
    }

    /// Write the rendered entry point to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}
