//! NuGet version scheme
//!
//! NuGet versions have one to four numeric parts (missing parts count as
//! zero), an optional `-prerelease` and optional `+metadata`. Metadata is
//! ignored for precedence and prerelease labels compare case-insensitively.

use std::cmp::Ordering;

use crate::version::scheme::VersionScheme;

pub struct NugetScheme;

/// One dot-separated prerelease label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Label {
    Numeric(u64),
    Alpha(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NugetVersion {
    release: [u64; 4],
    pre: Vec<Label>,
}

impl NugetVersion {
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Normalized string form used in NuGet URLs (three parts unless the
    /// fourth is set, lower-cased prerelease)
    pub fn normalized(&self) -> String {
        let [major, minor, patch, revision] = self.release;
        let mut out = if revision > 0 {
            format!("{}.{}.{}.{}", major, minor, patch, revision)
        } else {
            format!("{}.{}.{}", major, minor, patch)
        };
        if !self.pre.is_empty() {
            let labels = self
                .pre
                .iter()
                .map(|label| match label {
                    Label::Numeric(n) => n.to_string(),
                    Label::Alpha(s) => s.clone(),
                })
                .collect::<Vec<_>>()
                .join(".");
            out.push('-');
            out.push_str(&labels);
        }
        out
    }
}

impl Ord for NugetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for NugetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl VersionScheme for NugetScheme {
    type Parsed = NugetVersion;

    fn parse(&self, version: &str) -> Option<NugetVersion> {
        let version = version.trim();
        let version = version.split_once('+').map_or(version, |(v, _)| v);
        let (core, pre) = match version.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (version, None),
        };

        let parts = core
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()?;
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }
        let mut release = [0u64; 4];
        release[..parts.len()].copy_from_slice(&parts);

        let pre = match pre {
            None => Vec::new(),
            Some(pre) => pre
                .split('.')
                .map(|label| {
                    if label.is_empty()
                        || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                    {
                        return None;
                    }
                    Some(match label.parse::<u64>() {
                        Ok(n) if label.bytes().all(|b| b.is_ascii_digit()) => Label::Numeric(n),
                        _ => Label::Alpha(label.to_ascii_lowercase()),
                    })
                })
                .collect::<Option<Vec<_>>>()?,
        };

        Some(NugetVersion { release, pre })
    }
}
