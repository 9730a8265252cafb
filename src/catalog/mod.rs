//! Environment catalog.
//!
//! Read-only registry of [`EnvironmentDescriptor`]s, built once at startup
//! and passed by reference to every component that needs it.

mod descriptor;
mod distros;

pub use descriptor::{BuildSystem, DescriptorBuilder, EnvironmentDescriptor, Hook, PackageFamily};

use crate::error::CatalogError;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Token selecting every registered environment
pub const WILDCARD: &str = "all";

/// Registry of environment descriptors keyed by canonical name
#[derive(Debug, Clone)]
pub struct Catalog {
    descriptors: BTreeMap<String, EnvironmentDescriptor>,
    aliases: HashMap<String, String>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate names and overlapping aliases
    pub fn new(
        descriptors: impl IntoIterator<Item = EnvironmentDescriptor>,
    ) -> Result<Self, CatalogError> {
        let mut by_name = BTreeMap::new();
        let mut aliases = HashMap::new();

        for descriptor in descriptors {
            if descriptor.name == WILDCARD || by_name.contains_key(&descriptor.name) {
                return Err(CatalogError::Conflict {
                    token: descriptor.name.clone(),
                });
            }
            for alias in &descriptor.aliases {
                if alias == WILDCARD
                    || aliases
                        .insert(alias.clone(), descriptor.name.clone())
                        .is_some()
                {
                    return Err(CatalogError::Conflict {
                        token: alias.clone(),
                    });
                }
            }
            by_name.insert(descriptor.name.clone(), descriptor);
        }

        // Names are only known after the first pass
        if let Some(clash) = aliases.keys().find(|alias| by_name.contains_key(*alias)) {
            return Err(CatalogError::Conflict {
                token: clash.clone(),
            });
        }

        Ok(Self {
            descriptors: by_name,
            aliases,
        })
    }

    /// Catalog of the built-in distributions
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(distros::builtin())
    }

    /// Resolve one token to its descriptors
    pub fn resolve(&self, token: &str) -> Result<Vec<&EnvironmentDescriptor>, CatalogError> {
        if token == WILDCARD {
            return Ok(self.descriptors.values().collect());
        }
        let name = self
            .aliases
            .get(token)
            .map(String::as_str)
            .unwrap_or(token);
        self.descriptors
            .get(name)
            .map(|descriptor| vec![descriptor])
            .ok_or_else(|| CatalogError::UnknownEnvironment {
                token: token.to_string(),
            })
    }

    /// Resolve several tokens to the deduplicated union, ordered by canonical name
    pub fn resolve_all<I, S>(&self, tokens: I) -> Result<Vec<&EnvironmentDescriptor>, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = BTreeSet::new();
        for token in tokens {
            for descriptor in self.resolve(token.as_ref())? {
                names.insert(descriptor.name.as_str());
            }
        }
        Ok(names
            .into_iter()
            .filter_map(|name| self.descriptors.get(name))
            .collect())
    }

    /// Look up a descriptor by canonical name
    pub fn get(&self, name: &str) -> Option<&EnvironmentDescriptor> {
        self.descriptors.get(name)
    }

    /// All descriptors ordered by canonical name
    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentDescriptor> {
        self.descriptors.values()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(descriptors: &[&EnvironmentDescriptor]) -> Vec<String> {
        descriptors.iter().map(|d| d.name.clone()).collect()
    }

    #[test]
    fn test_wildcard_returns_every_descriptor_once_sorted() {
        let catalog = Catalog::builtin().expect("builtin catalog is consistent");
        let all = catalog.resolve_all(["all", "fedora", "centos7"]).unwrap();
        assert_eq!(all.len(), catalog.len());
        let resolved = names(&all);
        let mut sorted = resolved.clone();
        sorted.sort();
        assert_eq!(resolved, sorted);
    }

    #[test]
    fn test_alias_resolves_to_canonical_descriptor() {
        let catalog = Catalog::builtin().unwrap();
        let resolved = catalog.resolve("xenial").unwrap();
        assert_eq!(names(&resolved), ["ubuntu1604"]);
    }

    #[test]
    fn test_union_is_deduplicated() {
        let catalog = Catalog::builtin().unwrap();
        let resolved = catalog
            .resolve_all(["stretch", "debian9", "ci", "centos7"])
            .unwrap();
        assert_eq!(names(&resolved), ["centos7", "debian9", "travis"]);
    }

    #[test]
    fn test_unknown_token_fails() {
        let catalog = Catalog::builtin().unwrap();
        let err = catalog.resolve_all(["centos7", "beos"]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownEnvironment { token } if token == "beos"));
    }

    #[test]
    fn test_alias_overlap_is_rejected() {
        let a = EnvironmentDescriptor::builder("a", "a:1", PackageFamily::Apt, BuildSystem::Make)
            .aliases(["shared"])
            .build();
        let b = EnvironmentDescriptor::builder("b", "b:1", PackageFamily::Apt, BuildSystem::Make)
            .aliases(["shared"])
            .build();
        assert!(matches!(
            Catalog::new([a, b]),
            Err(CatalogError::Conflict { token }) if token == "shared"
        ));
    }

    #[test]
    fn test_alias_shadowing_a_name_is_rejected() {
        let a = EnvironmentDescriptor::builder("a", "a:1", PackageFamily::Apt, BuildSystem::Make)
            .aliases(["b"])
            .build();
        let b = EnvironmentDescriptor::builder("b", "b:1", PackageFamily::Apt, BuildSystem::Make)
            .build();
        assert!(Catalog::new([a, b]).is_err());
    }
}
