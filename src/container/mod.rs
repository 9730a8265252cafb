//! Container engine integration.
//!
//! Every engine call goes through the [`ContainerEngine`] trait so the
//! pipelines can be driven by [`DockerEngine`] in production and by
//! recording fakes in tests.
//!
//! # Module Structure
//!
//! - `engine` - Process execution of the engine command line
//! - `invocation` - Immutable `run` invocations and their flags
//! - `image` - Image builds and content-addressed id lookup
//! - `gc` - Removal of exited containers and dangling images

mod engine;
mod gc;
mod image;
mod invocation;

pub use engine::{DEFAULT_ENGINE, DockerEngine};
pub use gc::{GcReport, collect_garbage};
pub use image::{ImageBuildOptions, build_args, build_image, image_id};
pub use invocation::{ContainerInvocation, InvocationBuilder, Mount};

use crate::error::Result;
use std::future::Future;

/// Namespace for environment image tags
pub const IMAGE_NAMESPACE: &str = "distro-build";

/// How a streamed invocation is attached to the caller's terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// Pipe stdout through the output manager
    Stream,
    /// Inherit stdin/stdout/stderr for interactive use
    Terminal,
}

/// Command surface of the container engine
pub trait ContainerEngine {
    /// Run the engine with `args`, blocking until it exits.
    /// A non-zero exit is an error.
    fn execute(&self, args: &[String], attach: Attach) -> impl Future<Output = Result<()>>;

    /// Run the engine with `args` and return its standard output
    fn capture(&self, args: &[String]) -> impl Future<Output = Result<String>>;

    /// Replace the current process with the engine running `args`.
    /// Returns only when replacement is unavailable or fails; the value is
    /// then the child's exit code.
    fn replace(&self, args: &[String]) -> Result<i32>;

    /// Command prefix granting elevated privileges (e.g. `sudo`), if any
    fn elevation(&self) -> Vec<String>;
}

/// Run a container invocation to completion
pub async fn run<E: ContainerEngine>(engine: &E, invocation: &ContainerInvocation) -> Result<()> {
    let attach = if invocation.interactive() {
        Attach::Terminal
    } else {
        Attach::Stream
    };
    log::debug!("Running container: {}", invocation.to_args().join(" "));
    engine.execute(&invocation.to_args(), attach).await
}
