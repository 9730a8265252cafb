//! Environment image builds and id resolution.

use super::{Attach, ContainerEngine};
use crate::catalog::EnvironmentDescriptor;
use crate::dockerfile::DockerImageSpec;
use crate::error::{ContainerError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Options shared by every image build in one command
#[derive(Debug, Clone, Default)]
pub struct ImageBuildOptions {
    /// Always attempt to pull a newer base image
    pub pull: bool,
    /// Host HTTP proxy, passed to proxy-eligible environments
    pub proxy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Id")]
    id: String,
}

/// Engine arguments for building `descriptor`'s image from `context`
pub fn build_args(
    descriptor: &EnvironmentDescriptor,
    context: &Path,
    options: &ImageBuildOptions,
) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if options.pull {
        args.push("--pull".to_string());
    }
    args.push("-t".to_string());
    args.push(descriptor.image_tag());

    if descriptor.proxy_eligible
        && let Some(proxy) = &options.proxy
    {
        for key in ["http_proxy", "https_proxy"] {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={proxy}"));
        }
    }

    args.push(context.display().to_string());
    args
}

/// Removes the build context directory when dropped
struct ContextDir(PathBuf);

impl Drop for ContextDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            log::warn!("Failed to remove build context {}: {}", self.0.display(), e);
        }
    }
}

/// Build `descriptor`'s image from `spec` and return its content-addressed id
pub async fn build_image<E: ContainerEngine>(
    engine: &E,
    descriptor: &EnvironmentDescriptor,
    spec: &DockerImageSpec,
    options: &ImageBuildOptions,
) -> Result<String> {
    let context = ContextDir(
        std::env::temp_dir().join(format!("distro-build-image-{}", uuid::Uuid::new_v4())),
    );
    std::fs::create_dir_all(&context.0)?;
    std::fs::write(context.0.join("Dockerfile"), spec.to_string())?;

    log::info!("Building image {}", descriptor.image_tag());
    engine
        .execute(&build_args(descriptor, &context.0, options), Attach::Stream)
        .await?;

    image_id(engine, &descriptor.image_tag()).await
}

/// Resolve an image name to its content-addressed id via `inspect`
pub async fn image_id<E: ContainerEngine>(engine: &E, image: &str) -> Result<String> {
    let args = vec![
        "inspect".to_string(),
        "--type".to_string(),
        "image".to_string(),
        image.to_string(),
    ];
    let json = engine.capture(&args).await?;
    parse_inspect(image, &json)
}

fn parse_inspect(image: &str, json: &str) -> Result<String> {
    let entries: Vec<InspectEntry> =
        serde_json::from_str(json).map_err(|e| ContainerError::Inspect {
            image: image.to_string(),
            reason: e.to_string(),
        })?;
    entries
        .into_iter()
        .next()
        .map(|entry| entry.id)
        .ok_or_else(|| {
            ContainerError::Inspect {
                image: image.to_string(),
                reason: "no such image".to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_build_args_with_pull_and_proxy() {
        let catalog = Catalog::builtin().unwrap();
        let centos = catalog.get("centos7").unwrap();
        let options = ImageBuildOptions {
            pull: true,
            proxy: Some("http://p:3128".to_string()),
        };
        assert_eq!(
            build_args(centos, Path::new("/tmp/ctx"), &options),
            [
                "build",
                "--pull",
                "-t",
                "distro-build/centos7",
                "--build-arg",
                "http_proxy=http://p:3128",
                "--build-arg",
                "https_proxy=http://p:3128",
                "/tmp/ctx",
            ]
        );
    }

    #[test]
    fn test_proxy_skipped_for_ineligible_environment() {
        let catalog = Catalog::builtin().unwrap();
        let suse = catalog.get("opensuse423").unwrap();
        let options = ImageBuildOptions {
            pull: false,
            proxy: Some("http://p:3128".to_string()),
        };
        assert_eq!(
            build_args(suse, Path::new("/ctx"), &options),
            ["build", "-t", "distro-build/opensuse423", "/ctx"]
        );
    }

    #[test]
    fn test_parse_inspect_takes_first_id() {
        let json = r#"[{"Id": "sha256:0123", "RepoTags": ["distro-build/centos7:latest"]}]"#;
        assert_eq!(parse_inspect("x", json).unwrap(), "sha256:0123");
        assert!(parse_inspect("x", "[]").is_err());
        assert!(parse_inspect("x", "not json").is_err());
    }
}
