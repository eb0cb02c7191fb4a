//! Normalized, ecosystem-agnostic package metadata

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;

use crate::purl::Coordinate;
use crate::repository::RepositoryCandidate;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct License {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An author, maintainer or other named party
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Party {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            role: None,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.is_empty());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Parse the common `Name <email> (url)` form
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (name, rest) = match value.find(['<', '(']) {
            Some(i) => (value[..i].trim(), &value[i..]),
            None => (value, ""),
        };
        let email = rest
            .split_once('<')
            .and_then(|(_, tail)| tail.split_once('>'))
            .map(|(email, _)| email.trim().to_string());
        match (name.is_empty(), email) {
            (true, None) => None,
            (true, Some(email)) => Some(Party::new(email.clone()).with_email(Some(email))),
            (false, email) => Some(Party::new(name).with_email(email)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    pub package: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Dependency group (e.g., "dev", "optional", a target framework)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub algorithm: String,
    pub signature: String,
}

impl Digest {
    pub fn new(algorithm: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            signature: signature.into(),
        }
    }

    /// Parse a Subresource Integrity string such as `sha512-<base64>`
    pub fn from_integrity(integrity: &str) -> Option<Self> {
        let (algorithm, signature) = integrity.trim().split_once('-')?;
        if algorithm.is_empty() || signature.is_empty() {
            return None;
        }
        Some(Self::new(algorithm, signature))
    }
}

/// Metadata of one package version, normalized across ecosystems
///
/// Everything except namespace, name and version is best-effort: a missing
/// field means the registry did not say.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub keywords: IndexSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Party>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_artifact_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_metadata_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_repository: Option<RepositoryCandidate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub digests: Vec<Digest>,
}

impl NormalizedMetadata {
    /// Empty record for a version-qualified coordinate
    pub fn new(coordinate: &Coordinate, version: &str) -> Self {
        Self {
            namespace: coordinate.namespace().map(String::from),
            name: coordinate.name().to_string(),
            version: version.to_string(),
            latest_version: None,
            description: None,
            homepage: None,
            publish_time: None,
            keywords: IndexSet::new(),
            licenses: Vec::new(),
            authors: Vec::new(),
            dependencies: Vec::new(),
            source_artifact_uri: None,
            package_uri: None,
            package_metadata_uri: None,
            source_repository: None,
            digests: Vec::new(),
        }
    }

    /// Add keywords, skipping blanks and duplicates
    pub fn add_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if !keyword.is_empty() {
                self.keywords.insert(keyword.to_string());
            }
        }
    }
}

/// Read a non-empty string field out of a JSON object
pub(crate) fn json_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse an RFC 3339 timestamp, tolerating a missing offset (treated as UTC)
pub(crate) fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}
