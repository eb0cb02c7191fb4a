//! Version listing as reported by a registry

use std::collections::HashMap;

use crate::version::ordering::sort_descending;
use crate::version::scheme::VersionScheme;

/// All versions of a package plus the tags the registry declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    /// Versions in registry order
    pub versions: Vec<String>,
    /// Registry-declared tags (e.g., {"latest": "4.17.21"})
    pub dist_tags: HashMap<String, String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self {
            versions,
            dist_tags: HashMap::new(),
        }
    }

    pub fn with_dist_tags(versions: Vec<String>, dist_tags: HashMap<String, String>) -> Self {
        Self {
            versions,
            dist_tags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The `latest` tag, if the registry declares one
    pub fn declared_latest(&self) -> Option<&str> {
        self.dist_tags
            .get("latest")
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Versions newest first
    pub fn sorted<S: VersionScheme + ?Sized>(&self, scheme: &S) -> Vec<String> {
        sort_descending(scheme, &self.versions)
    }

    /// Latest version: the declared `latest` tag, falling back to the newest version
    pub fn latest<S: VersionScheme + ?Sized>(&self, scheme: &S) -> Option<String> {
        if let Some(latest) = self.declared_latest() {
            return Some(latest.to_string());
        }
        self.sorted(scheme).into_iter().next()
    }
}
