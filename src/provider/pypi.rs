//! PyPI provider
//!
//! Uses the JSON API: `{base}/pypi/{name}/json` lists every release and
//! declares the latest in `info.version`, `{base}/pypi/{name}/{version}/json`
//! describes one release. Source distributions are served from a separate
//! files host.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use pep508_rs::{Requirement, VerbatimUrl, VersionOrUrl};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{DEFAULT_PYPI_FILES_URL, DEFAULT_PYPI_URL};
use crate::download::{DownloadOptions, Downloaded};
use crate::error::{DownloadError, ResolveError};
use crate::metadata::{Dependency, Digest, License, NormalizedMetadata, Party, json_str, parse_time};
use crate::provider::{
    ArtifactKind, ArtifactLocation, Provider, ProviderContext, RawDocument, download_pinned,
    fetch_failed, pin_version,
};
use crate::purl::{Coordinate, Ecosystem};
use crate::repository;
use crate::version::PackageVersions;
use crate::version::schemes::PypiScheme;

/// `project_urls` keys naming the source repository
const REPOSITORY_KEYS: &[&str] = &["source", "source code", "repository", "code"];

static EXTRA_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"extra\s*==\s*["']([^"']+)["']"#).expect("valid extra marker regex")
});

pub struct PypiProvider {
    context: ProviderContext,
    base_url: String,
    files_url: String,
}

impl PypiProvider {
    pub fn new(context: ProviderContext, base_url: &str, files_url: &str) -> Self {
        Self {
            context,
            base_url: base_url.trim_end_matches('/').to_string(),
            files_url: files_url.trim_end_matches('/').to_string(),
        }
    }

    fn project_url(&self, coordinate: &Coordinate) -> String {
        format!("{}/pypi/{}/json", self.base_url, coordinate.name())
    }

    fn release_url(&self, coordinate: &Coordinate, version: &str) -> String {
        format!("{}/pypi/{}/{}/json", self.base_url, coordinate.name(), version)
    }

    fn sdist_url(&self, coordinate: &Coordinate, version: &str) -> String {
        let name = coordinate.name();
        let first = name.chars().next().unwrap_or('_');
        format!(
            "{}/packages/source/{}/{}/{}-{}.tar.gz",
            self.files_url, first, name, name, version
        )
    }

    async fn document(
        &self,
        coordinate: &Coordinate,
        url: &str,
        use_cache: bool,
    ) -> Result<Value, ResolveError> {
        let document = self
            .context
            .cache
            .get_json(url, use_cache)
            .await
            .map_err(fetch_failed(coordinate))?;
        if document.get("info").is_none_or(|info| !info.is_object()) {
            warn!("PyPI returned a document without info: {}", url);
            return Err(ResolveError::parse(coordinate, "document has no info object"));
        }
        Ok(document)
    }

    async fn project_document(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Value, ResolveError> {
        self.document(coordinate, &self.project_url(coordinate), use_cache)
            .await
    }

    fn package_versions(document: &Value) -> PackageVersions {
        let versions = document
            .get("releases")
            .and_then(Value::as_object)
            .map(|releases| releases.keys().cloned().collect())
            .unwrap_or_default();
        let dist_tags = document
            .get("info")
            .and_then(|info| json_str(info, "version"))
            .map(|latest| HashMap::from([("latest".to_string(), latest.to_string())]))
            .unwrap_or_default();
        PackageVersions::with_dist_tags(versions, dist_tags)
    }

    fn normalize(
        &self,
        coordinate: &Coordinate,
        document: &Value,
        version: &str,
    ) -> NormalizedMetadata {
        let info = document.get("info").unwrap_or(&Value::Null);
        let project_urls = info.get("project_urls").and_then(Value::as_object);
        let mut metadata = NormalizedMetadata::new(coordinate, version);

        metadata.description = json_str(info, "summary").map(String::from);
        metadata.homepage = json_str(info, "home_page")
            .or_else(|| {
                project_urls?
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("homepage"))
                    .and_then(|(_, url)| url.as_str())
            })
            .map(String::from);

        if let Some(keywords) = json_str(info, "keywords") {
            if keywords.contains(',') {
                metadata.add_keywords(keywords.split(','));
            } else {
                metadata.add_keywords(keywords.split_whitespace());
            }
        }

        metadata.licenses = licenses(info);
        metadata.authors = authors(info);
        metadata.dependencies = info
            .get("requires_dist")
            .and_then(Value::as_array)
            .map(|requirements| {
                requirements
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(requirement_dependency)
                    .collect()
            })
            .unwrap_or_default();

        let files = document.get("urls").and_then(Value::as_array);
        let sdist = files.and_then(|files| {
            files
                .iter()
                .find(|file| json_str(file, "packagetype") == Some("sdist"))
        });
        let wheel = files.and_then(|files| {
            files
                .iter()
                .find(|file| json_str(file, "packagetype") == Some("bdist_wheel"))
        });

        metadata.source_artifact_uri = sdist
            .and_then(|file| json_str(file, "url"))
            .map(String::from)
            .or_else(|| Some(self.sdist_url(coordinate, version)));
        metadata.package_uri = wheel.and_then(|file| json_str(file, "url")).map(String::from);
        metadata.package_metadata_uri = Some(self.release_url(coordinate, version));

        if let Some(sdist) = sdist {
            metadata.publish_time = json_str(sdist, "upload_time_iso_8601")
                .or_else(|| json_str(sdist, "upload_time"))
                .and_then(parse_time);
            if let Some(digests) = sdist.get("digests").and_then(Value::as_object) {
                metadata.digests = digests
                    .iter()
                    .filter_map(|(algorithm, signature)| {
                        let signature = signature.as_str().filter(|s| !s.is_empty())?;
                        Some(Digest::new(algorithm.as_str(), signature))
                    })
                    .collect();
            }
        }

        let repository_urls = project_urls
            .map(|urls| {
                REPOSITORY_KEYS
                    .iter()
                    .filter_map(|wanted| {
                        urls.iter()
                            .find(|(key, _)| key.trim().eq_ignore_ascii_case(wanted))
                            .and_then(|(_, url)| url.as_str())
                    })
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        metadata.source_repository =
            repository::infer(&coordinate.with_version(version), repository_urls)
                .into_iter()
                .next();

        metadata
    }
}

impl Default for PypiProvider {
    fn default() -> Self {
        Self::new(ProviderContext::default(), DEFAULT_PYPI_URL, DEFAULT_PYPI_FILES_URL)
    }
}

/// `license_expression`, else a one-line `license`, else the trove classifiers
fn licenses(info: &Value) -> Vec<License> {
    let named = |name: &str| License {
        name: Some(name.to_string()),
        url: None,
    };

    if let Some(expression) = json_str(info, "license_expression") {
        return vec![named(expression)];
    }
    if let Some(license) = json_str(info, "license")
        && !license.contains('\n')
        && !license.eq_ignore_ascii_case("UNKNOWN")
    {
        return vec![named(license)];
    }
    info.get("classifiers")
        .and_then(Value::as_array)
        .map(|classifiers| {
            classifiers
                .iter()
                .filter_map(Value::as_str)
                .filter(|c| c.starts_with("License ::"))
                .filter_map(|c| c.rsplit("::").next())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(named)
                .collect()
        })
        .unwrap_or_default()
}

/// `author`/`maintainer` with their `_email` fields. The email field alone
/// may hold `Name <email>` entries.
fn authors(info: &Value) -> Vec<Party> {
    let mut parties = Vec::new();
    for role in ["author", "maintainer"] {
        let name = json_str(info, role);
        let email = json_str(info, &format!("{}_email", role));
        match (name, email) {
            (Some(name), email) => parties.push(
                Party::new(name)
                    .with_email(email.map(String::from))
                    .with_role(role),
            ),
            (None, Some(email)) => parties.extend(
                email
                    .split(',')
                    .filter_map(Party::parse)
                    .map(|party| party.with_role(role)),
            ),
            (None, None) => {}
        }
    }
    parties
}

/// Dependency from a `requires_dist` entry such as
/// `PySocks!=1.5.7,>=1.5.6; extra == "socks"`
fn requirement_dependency(requirement: &str) -> Option<Dependency> {
    let parsed = Requirement::<VerbatimUrl>::from_str(requirement)
        .inspect_err(|e| debug!("Failed to parse requirement '{}': {}", requirement, e))
        .ok()?;

    let constraint = match &parsed.version_or_url {
        Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
            Some(specifiers.to_string()).filter(|s| !s.is_empty())
        }
        Some(VersionOrUrl::Url(url)) => Some(url.to_string()),
        None => None,
    };
    let scope = requirement
        .split_once(';')
        .and_then(|(_, marker)| EXTRA_MARKER.captures(marker))
        .map(|captures| captures[1].to_string());

    Some(Dependency {
        package: Coordinate::new(Ecosystem::Pypi, parsed.name.to_string()).ok()?,
        constraint,
        scope,
    })
}

#[async_trait::async_trait]
impl Provider for PypiProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pypi
    }

    async fn enumerate_versions(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Vec<String>, ResolveError> {
        let document = self.project_document(coordinate, use_cache).await?;
        Ok(Self::package_versions(&document).sorted(&PypiScheme))
    }

    async fn latest_version(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Option<String>, ResolveError> {
        let document = self.project_document(coordinate, use_cache).await?;
        Ok(Self::package_versions(&document).latest(&PypiScheme))
    }

    async fn fetch_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<RawDocument, ResolveError> {
        Ok(RawDocument::Json(self.project_document(coordinate, use_cache).await?))
    }

    async fn resolve_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<NormalizedMetadata, ResolveError> {
        let pinned = pin_version(self, coordinate, use_cache).await?;
        let version = pinned.version().unwrap_or_default();

        let release = self
            .document(&pinned, &self.release_url(coordinate, version), use_cache)
            .await?;
        let mut metadata = self.normalize(coordinate, &release, version);

        metadata.latest_version = self.latest_version(coordinate, use_cache).await?;
        Ok(metadata)
    }

    fn artifact_locations(&self, coordinate: &Coordinate) -> Vec<ArtifactLocation> {
        match coordinate.version() {
            Some(version) => vec![ArtifactLocation::new(
                ArtifactKind::Source,
                self.sdist_url(coordinate, version),
            )],
            None => Vec::new(),
        }
    }

    async fn download(
        &self,
        coordinate: &Coordinate,
        options: &DownloadOptions,
    ) -> Result<Downloaded, DownloadError> {
        download_pinned(self, &self.context, coordinate, options).await
    }
}
