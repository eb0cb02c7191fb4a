//! Repository URL parsing
//!
//! Turns the URL forms registries put in their repository fields into
//! coordinates of a hosted repository.

use reqwest::Url;

use crate::purl::{Coordinate, Ecosystem};

/// URL schemes accepted in repository fields
const SUPPORTED_SCHEMES: &[&str] = &[
    "http", "https", "git", "ssh", "git+https", "git+http", "git+ssh", "git+git",
];

/// Shorthand prefixes (`github:owner/repo`)
const SHORTHANDS: &[(&str, Ecosystem)] = &[
    ("github:", Ecosystem::Github),
    ("gitlab:", Ecosystem::Gitlab),
    ("bitbucket:", Ecosystem::Bitbucket),
];

fn host_ecosystem(host: &str) -> Option<Ecosystem> {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.").unwrap_or(&host) {
        "github.com" => Some(Ecosystem::Github),
        "gitlab.com" => Some(Ecosystem::Gitlab),
        "bitbucket.org" => Some(Ecosystem::Bitbucket),
        _ => None,
    }
}

/// Build `pkg:<host>/<owner>/<repo>` from the first two path segments
fn repository_coordinate(ecosystem: Ecosystem, path: &str) -> Option<Coordinate> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Coordinate::new(ecosystem, repo)
        .ok()
        .map(|c| c.with_namespace(owner))
}

/// Parse a repository URL into the coordinate of the repository it points at.
///
/// Returns `None` for anything that is not a recognized forge URL: unknown
/// schemes, unknown hosts, scp-like `git@host:path` forms and URLs without an
/// owner and repository.
pub fn parse_repository_url(url: &str) -> Option<Coordinate> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    for (prefix, ecosystem) in SHORTHANDS {
        let matches = url
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            let rest = url[prefix.len()..].split(['#', '?']).next().unwrap_or_default();
            return repository_coordinate(*ecosystem, rest);
        }
    }

    let parsed = Url::parse(url).ok()?;
    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return None;
    }
    let ecosystem = host_ecosystem(parsed.host_str()?)?;
    repository_coordinate(ecosystem, parsed.path())
}
