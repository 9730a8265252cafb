//! Process execution of the container engine command line.

use super::{Attach, ContainerEngine};
use crate::cli::OutputManager;
use crate::error::{CliError, ContainerError, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Engine command line used unless overridden; host docker access requires sudo
pub const DEFAULT_ENGINE: &str = "sudo docker";

/// Engine that shells out to the docker CLI
#[derive(Debug, Clone)]
pub struct DockerEngine {
    command: Vec<String>,
    output: OutputManager,
}

impl DockerEngine {
    /// Engine invoking `command_line` (split on whitespace) for every call
    pub fn new(command_line: &str, output: OutputManager) -> Result<Self> {
        let command: Vec<String> = command_line.split_whitespace().map(str::to_string).collect();
        if command.is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "container engine command is empty".to_string(),
            }
            .into());
        }
        Ok(Self { command, output })
    }

    fn describe(&self, args: &[String]) -> String {
        let mut line = self.command.clone();
        line.extend(args.iter().cloned());
        line.join(" ")
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.command[0]);
        command.args(&self.command[1..]).args(args);
        command
    }

    fn failure(&self, args: &[String], status: std::process::ExitStatus) -> ContainerError {
        ContainerError::EngineFailure {
            command: self.describe(args),
            code: status.code().unwrap_or(-1),
        }
    }

    /// Echo `stdout` line by line until EOF, tolerating non-UTF-8 bytes
    async fn relay(&self, stdout: impl AsyncRead + Unpin) {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    let _ = self.output.indent(text.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    log::warn!("Stopped relaying engine output: {}", e);
                    // Drain the rest; the child must not hit a closed pipe
                    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                    break;
                }
            }
        }
    }

    fn spawn_error(&self, args: &[String], e: std::io::Error) -> ContainerError {
        ContainerError::Spawn {
            command: self.describe(args),
            reason: e.to_string(),
        }
    }
}

impl ContainerEngine for DockerEngine {
    async fn execute(&self, args: &[String], attach: Attach) -> Result<()> {
        log::debug!("Executing: {}", self.describe(args));
        let mut command = self.command(args);

        let status = match attach {
            Attach::Terminal => command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|e| self.spawn_error(args, e))?,
            Attach::Stream => {
                let mut child = command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit())
                    .spawn()
                    .map_err(|e| self.spawn_error(args, e))?;

                if let Some(stdout) = child.stdout.take() {
                    self.relay(stdout).await;
                }

                child.wait().await.map_err(|e| self.spawn_error(args, e))?
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(self.failure(args, status).into())
        }
    }

    async fn capture(&self, args: &[String]) -> Result<String> {
        log::debug!("Capturing: {}", self.describe(args));
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))?;

        if !output.status.success() {
            log::warn!(
                "{} failed: {}",
                self.describe(args),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(self.failure(args, output.status).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    #[cfg(unix)]
    fn replace(&self, args: &[String]) -> Result<i32> {
        use std::os::unix::process::CommandExt;

        log::debug!("Replacing process with: {}", self.describe(args));
        let error = std::process::Command::new(&self.command[0])
            .args(&self.command[1..])
            .args(args)
            .exec();
        Err(self.spawn_error(args, error).into())
    }

    #[cfg(not(unix))]
    fn replace(&self, args: &[String]) -> Result<i32> {
        // No exec here: spawn, wait, and hand the exit code back to the caller
        let status = std::process::Command::new(&self.command[0])
            .args(&self.command[1..])
            .args(args)
            .status()
            .map_err(|e| self.spawn_error(args, e))?;
        Ok(status.code().unwrap_or(-1))
    }

    fn elevation(&self) -> Vec<String> {
        match self.command.first().map(String::as_str) {
            Some("sudo") | Some("doas") => vec![self.command[0].clone()],
            _ => Vec::new(),
        }
    }
}
