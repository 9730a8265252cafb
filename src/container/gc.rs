//! Reclaims exited containers and dangling images.

use super::{Attach, ContainerEngine};
use crate::error::Result;

/// What a garbage collection pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Removed container ids
    pub containers: Vec<String>,
    /// Removed image ids
    pub images: Vec<String>,
}

fn ids(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Remove exited containers and dangling images, one batched call per set
pub async fn collect_garbage<E: ContainerEngine>(engine: &E) -> Result<GcReport> {
    let containers = ids(&engine
        .capture(&args(&["ps", "-a", "-q", "-f", "status=exited"]))
        .await?);
    if !containers.is_empty() {
        let mut rm = args(&["rm"]);
        rm.extend(containers.iter().cloned());
        engine.execute(&rm, Attach::Stream).await?;
    }

    let images = ids(&engine
        .capture(&args(&["images", "-q", "-f", "dangling=true"]))
        .await?);
    if !images.is_empty() {
        let mut rmi = args(&["rmi"]);
        rmi.extend(images.iter().cloned());
        engine.execute(&rmi, Attach::Stream).await?;
    }

    log::info!(
        "Removed {} container(s) and {} image(s)",
        containers.len(),
        images.len()
    );
    Ok(GcReport { containers, images })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_skip_blank_lines() {
        assert_eq!(ids("abc\n\n  def \n"), ["abc", "def"]);
        assert!(ids("\n").is_empty());
    }
}
