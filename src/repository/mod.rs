//! Repository inference engine
//!
//! Derives where a package's source lives, in priority order:
//!
//! 1. the platform's own tree for built-in modules ([`builtin`])
//! 2. an explicit repository URL taken from the registry document ([`url`])
//!
//! Nothing else is consulted. Homepages and descriptions are never mined for
//! URLs, so a package without an explicit field gets no candidate.

pub mod builtin;
pub mod url;

use serde::Serialize;
use tracing::debug;

use crate::purl::Coordinate;

pub use builtin::builtin_repository;
pub use url::parse_repository_url;

/// A guess at a package's source repository
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryCandidate {
    pub coordinate: Coordinate,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl RepositoryCandidate {
    pub fn certain(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            confidence: 1.0,
        }
    }
}

/// Infer repository candidates for `coordinate` from the explicit repository
/// URLs found in its registry document.
///
/// Returns at most one candidate. Malformed or unsupported URLs are skipped.
pub fn infer<I, S>(coordinate: &Coordinate, repository_urls: I) -> Vec<RepositoryCandidate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(repository) = builtin_repository(coordinate) {
        return vec![RepositoryCandidate::certain(repository)];
    }

    for url in repository_urls {
        let url = url.as_ref();
        match parse_repository_url(url) {
            Some(repository) => return vec![RepositoryCandidate::certain(repository)],
            None => debug!("Ignoring unrecognized repository URL for {}: {}", coordinate, url),
        }
    }

    Vec::new()
}
