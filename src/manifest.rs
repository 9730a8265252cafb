//! CI manifest loading and schema validation.
//!
//! The manifest is a Travis-style YAML file. Only three keys matter here:
//! `addons.apt.sources`, `addons.apt.packages` and `script`. They are checked
//! up front so a malformed file fails with the offending key instead of deep
//! inside image generation.

use crate::error::ManifestError;
use serde_yaml::Value;
use std::path::Path;

/// Repository source registered in a manifest-derived image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptSource {
    /// Line passed to `add-apt-repository`
    pub line: String,
    /// Signing key fetched into the image before registration
    pub key_url: Option<String>,
}

/// Validated CI manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiManifest {
    /// Repository sources, deduplicated in declaration order
    pub sources: Vec<AptSource>,
    /// Packages to install
    pub packages: Vec<String>,
    /// Shell commands, in order
    pub script: Vec<String>,
}

/// Known source aliases accepted as bare strings
fn whitelisted(alias: &str) -> Option<AptSource> {
    let (line, key_url) = match alias {
        "ubuntu-toolchain-r-test" => ("ppa:ubuntu-toolchain-r/test", None),
        "llvm-toolchain-trusty" => (
            "deb http://apt.llvm.org/trusty/ llvm-toolchain-trusty main",
            Some("https://apt.llvm.org/llvm-snapshot.gpg.key"),
        ),
        "george-edison55-precise-backports" => ("ppa:george-edison55/cmake-3.x", None),
        _ => return None,
    };
    Some(AptSource {
        line: line.to_string(),
        key_url: key_url.map(str::to_string),
    })
}

fn format_error(key: &str, reason: impl Into<String>) -> ManifestError {
    ManifestError::Format {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> Result<&'a Value, ManifestError> {
    key.split('.')
        .try_fold(root, |node, part| node.get(part))
        .ok_or_else(|| format_error(key, "missing"))
}

fn string_list(node: &Value, key: &str) -> Result<Vec<String>, ManifestError> {
    let items = node
        .as_sequence()
        .ok_or_else(|| format_error(key, "expected a list"))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format_error(&format!("{key}[{index}]"), "expected a string"))
        })
        .collect()
}

fn source(node: &Value, key: &str) -> Result<AptSource, ManifestError> {
    if let Some(alias) = node.as_str() {
        return whitelisted(alias)
            .ok_or_else(|| format_error(key, format!("unknown source alias '{alias}'")));
    }
    if node.as_mapping().is_none() {
        return Err(format_error(key, "expected a string or a mapping"));
    }
    let line = node
        .get("sourceline")
        .ok_or_else(|| format_error(&format!("{key}.sourceline"), "missing"))?
        .as_str()
        .ok_or_else(|| format_error(&format!("{key}.sourceline"), "expected a string"))?;
    let key_url = match node.get("key_url") {
        None => None,
        Some(url) => Some(
            url.as_str()
                .ok_or_else(|| format_error(&format!("{key}.key_url"), "expected a string"))?
                .to_string(),
        ),
    };
    Ok(AptSource {
        line: line.to_string(),
        key_url,
    })
}

/// Parse and validate manifest text
pub fn parse(text: &str) -> Result<CiManifest, ManifestError> {
    let root: Value = serde_yaml::from_str(text).map_err(|e| ManifestError::Parse {
        reason: e.to_string(),
    })?;

    let key = "addons.apt.sources";
    let declared = lookup(&root, key)?
        .as_sequence()
        .ok_or_else(|| format_error(key, "expected a list"))?;
    let mut sources: Vec<AptSource> = Vec::new();
    for (index, node) in declared.iter().enumerate() {
        let parsed = source(node, &format!("{key}[{index}]"))?;
        if !sources.contains(&parsed) {
            sources.push(parsed);
        }
    }

    let packages = string_list(lookup(&root, "addons.apt.packages")?, "addons.apt.packages")?;

    let script_node = lookup(&root, "script")?;
    let script = match script_node.as_str() {
        Some(single) => vec![single.to_string()],
        None => string_list(script_node, "script")?,
    };

    Ok(CiManifest {
        sources,
        packages,
        script,
    })
}

/// Read and validate the manifest at `path`
pub fn load(path: &Path) -> Result<CiManifest, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ManifestError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Parse {
                reason: format!("cannot read {}: {}", path.display(), e),
            }
        }
    })?;
    log::debug!("Loaded CI manifest from {}", path.display());
    parse(&text)
}
