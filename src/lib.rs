//! # distro_build
//!
//! Build and package one project for a matrix of Linux distributions, each
//! inside its own container image.
//!
//! ## Features
//!
//! - **Environment Catalog**: Named distributions with aliases and `all`
//! - **Image Generation**: Deterministic Dockerfiles per environment
//! - **Packaging**: RPM, DEB and CI-script builds from committed revisions
//! - **Incremental Builds**: Persistent `build-<env>` directories per environment
//! - **Garbage Collection**: Reclaim exited containers and dangling images
//!
//! ## Usage
//!
//! ```bash
//! distro-build build-images all
//! distro-build make fc26 -DCMAKE_BUILD_TYPE=Debug -j8
//! distro-build pkg centos7 --ref v1.2.0
//! distro-build docker-gc
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod container;
pub mod dockerfile;
pub mod error;
pub mod incremental;
pub mod manifest;
pub mod pipeline;
pub mod shell;
pub mod snapshot;

pub use catalog::{Catalog, EnvironmentDescriptor};
pub use cli::Args;
pub use config::{Identity, ProjectLayout};
pub use container::{ContainerEngine, ContainerInvocation, DockerEngine};
pub use dockerfile::{DockerImageSpec, DockerfileGenerator};
pub use error::{BuildError, Result};
pub use incremental::IncrementalBuildDriver;
pub use pipeline::PackageBuildPipeline;
pub use snapshot::SourceSnapshotter;
