//! NuGet provider
//!
//! ## API Strategy
//! - **versions**: `{base}/v3-flatcontainer/{id}/index.json`
//! - **metadata**: `{base}/v3/registration5-semver1/{id}/index.json`; pages
//!   that are not inlined are fetched through their `@id`, only when their
//!   `lower`/`upper` bounds cover the wanted version
//! - **repository**: the catalog entry's `repository`, else the
//!   `<repository url>` of the package's `.nuspec`
//! - **artifact**: `{base}/v3-flatcontainer/{id}/{version}/{id}.{version}.nupkg`

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DEFAULT_NUGET_URL;
use crate::download::{DownloadOptions, Downloaded};
use crate::error::{DownloadError, ResolveError};
use crate::metadata::{Dependency, License, NormalizedMetadata, Party, json_str, parse_time};
use crate::provider::{
    ArtifactKind, ArtifactLocation, Provider, ProviderContext, RawDocument, download_pinned,
    fetch_failed, pin_version,
};
use crate::purl::{Coordinate, Ecosystem};
use crate::repository;
use crate::version::schemes::NugetScheme;
use crate::version::{VersionScheme, compare, sort_descending};

static NUSPEC_REPOSITORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<repository\b[^>]*?\burl\s*=\s*"([^"]+)""#).expect("valid repository regex")
});

/// Response from the flat container version listing
#[derive(Debug, Deserialize)]
struct FlatContainerIndex {
    versions: Vec<String>,
}

pub struct NugetProvider {
    context: ProviderContext,
    base_url: String,
}

impl NugetProvider {
    pub fn new(context: ProviderContext, base_url: &str) -> Self {
        Self {
            context,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn package_id(coordinate: &Coordinate) -> String {
        coordinate.name().to_lowercase()
    }

    /// Lower-cased normalized version as used in flat container URLs
    fn url_version(version: &str) -> String {
        NugetScheme
            .parse(version)
            .map(|v| v.normalized())
            .unwrap_or_else(|| version.to_string())
            .to_lowercase()
    }

    fn registration_url(&self, coordinate: &Coordinate) -> String {
        format!(
            "{}/v3/registration5-semver1/{}/index.json",
            self.base_url,
            Self::package_id(coordinate)
        )
    }

    fn package_file_url(&self, coordinate: &Coordinate, version: &str, extension: &str) -> String {
        let id = Self::package_id(coordinate);
        let version = Self::url_version(version);
        format!(
            "{}/v3-flatcontainer/{}/{}/{}.{}.{}",
            self.base_url, id, version, id, version, extension
        )
    }

    async fn registration_index(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Value, ResolveError> {
        self.context
            .cache
            .get_json(&self.registration_url(coordinate), use_cache)
            .await
            .map_err(fetch_failed(coordinate))
    }

    /// Find the registration leaf (`{ catalogEntry, packageContent }`) for `version`
    async fn registration_leaf(
        &self,
        coordinate: &Coordinate,
        index: &Value,
        version: &str,
        use_cache: bool,
    ) -> Result<Option<Value>, ResolveError> {
        let Some(pages) = index.get("items").and_then(Value::as_array) else {
            warn!("NuGet registration index without items: {}", coordinate);
            return Err(ResolveError::parse(coordinate, "registration index has no items"));
        };

        for page in pages {
            if let Some(leaf) = find_leaf(page, version) {
                return Ok(Some(leaf.clone()));
            }
            if page.get("items").is_some() || !page_covers(page, version) {
                continue;
            }
            let Some(page_url) = json_str(page, "@id") else {
                continue;
            };
            debug!("Fetching NuGet registration page {}", page_url);
            let page = self
                .context
                .cache
                .get_json(page_url, use_cache)
                .await
                .map_err(fetch_failed(coordinate))?;
            if let Some(leaf) = find_leaf(&page, version) {
                return Ok(Some(leaf.clone()));
            }
        }

        Ok(None)
    }

    /// `<repository url="...">` from the package's `.nuspec`, best-effort
    async fn nuspec_repository(
        &self,
        coordinate: &Coordinate,
        version: &str,
        use_cache: bool,
    ) -> Option<String> {
        let url = self.package_file_url(coordinate, version, "nuspec");
        let nuspec = self
            .context
            .cache
            .get_text(&url, use_cache)
            .await
            .inspect_err(|e| debug!("No nuspec for {}: {}", coordinate, e))
            .ok()?;
        NUSPEC_REPOSITORY
            .captures(&nuspec)
            .map(|captures| captures[1].to_string())
    }

    fn normalize(
        &self,
        coordinate: &Coordinate,
        version: &str,
        leaf: &Value,
    ) -> NormalizedMetadata {
        let entry = leaf.get("catalogEntry").unwrap_or(&Value::Null);
        let mut metadata = NormalizedMetadata::new(coordinate, version);

        metadata.description = json_str(entry, "description").map(String::from);
        metadata.homepage = json_str(entry, "projectUrl").map(String::from);
        // Unlisted packages carry a 1900-01-01 placeholder
        metadata.publish_time = json_str(entry, "published")
            .and_then(parse_time)
            .filter(|time| time.year() != 1900);

        match entry.get("tags") {
            Some(Value::Array(tags)) => {
                metadata.add_keywords(tags.iter().filter_map(Value::as_str))
            }
            Some(Value::String(tags)) => metadata.add_keywords(tags.split_whitespace()),
            _ => {}
        }

        let license = License {
            name: json_str(entry, "licenseExpression").map(String::from),
            url: json_str(entry, "licenseUrl").map(String::from),
        };
        if license.name.is_some() || license.url.is_some() {
            metadata.licenses.push(license);
        }

        match entry.get("authors") {
            Some(Value::String(authors)) => metadata.authors.extend(
                authors
                    .split(',')
                    .filter_map(Party::parse)
                    .map(|party| party.with_role("author")),
            ),
            Some(Value::Array(authors)) => metadata.authors.extend(
                authors
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(Party::parse)
                    .map(|party| party.with_role("author")),
            ),
            _ => {}
        }

        metadata.dependencies = dependency_groups(entry);

        metadata.package_uri = json_str(leaf, "packageContent")
            .or_else(|| json_str(entry, "packageContent"))
            .map(String::from)
            .or_else(|| Some(self.package_file_url(coordinate, version, "nupkg")));
        metadata.package_metadata_uri = json_str(leaf, "@id").map(String::from);

        metadata
    }
}

impl Default for NugetProvider {
    fn default() -> Self {
        Self::new(ProviderContext::default(), DEFAULT_NUGET_URL)
    }
}

fn same_version(a: &str, b: &str) -> bool {
    compare(&NugetScheme, a, b) == Ordering::Equal
}

fn find_leaf<'a>(page: &'a Value, version: &str) -> Option<&'a Value> {
    page.get("items")?.as_array()?.iter().find(|leaf| {
        leaf.get("catalogEntry")
            .and_then(|entry| json_str(entry, "version"))
            .is_some_and(|v| same_version(v, version))
    })
}

/// Whether a page's `lower`/`upper` bounds include `version`. Pages without
/// bounds are assumed to.
fn page_covers(page: &Value, version: &str) -> bool {
    let above_lower = json_str(page, "lower")
        .is_none_or(|lower| compare(&NugetScheme, version, lower) != Ordering::Less);
    let below_upper = json_str(page, "upper")
        .is_none_or(|upper| compare(&NugetScheme, version, upper) != Ordering::Greater);
    above_lower && below_upper
}

/// `repository` as a plain string or a `{ "type", "url" }` object
fn repository_url(entry: &Value) -> Option<String> {
    match entry.get("repository")? {
        Value::String(url) => Some(url.clone()),
        repository @ Value::Object(_) => json_str(repository, "url").map(String::from),
        _ => None,
    }
}

fn dependency_groups(entry: &Value) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    let Some(groups) = entry.get("dependencyGroups").and_then(Value::as_array) else {
        return dependencies;
    };
    for group in groups {
        let scope = json_str(group, "targetFramework").map(String::from);
        let Some(entries) = group.get("dependencies").and_then(Value::as_array) else {
            continue;
        };
        for dependency in entries {
            let package = json_str(dependency, "id")
                .and_then(|id| Coordinate::new(Ecosystem::Nuget, id).ok());
            let Some(package) = package else {
                continue;
            };
            dependencies.push(Dependency {
                package,
                constraint: json_str(dependency, "range").map(String::from),
                scope: scope.clone(),
            });
        }
    }
    dependencies
}

#[async_trait::async_trait]
impl Provider for NugetProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Nuget
    }

    async fn enumerate_versions(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Vec<String>, ResolveError> {
        let url = format!(
            "{}/v3-flatcontainer/{}/index.json",
            self.base_url,
            Self::package_id(coordinate)
        );
        let document = self
            .context
            .cache
            .get_json(&url, use_cache)
            .await
            .map_err(fetch_failed(coordinate))?;
        let index: FlatContainerIndex = serde_json::from_value(document).map_err(|e| {
            warn!("Failed to parse NuGet version index: {}", e);
            ResolveError::parse(coordinate, e.to_string())
        })?;
        Ok(sort_descending(&NugetScheme, &index.versions))
    }

    /// NuGet declares no latest tag, so this is the newest listed version
    async fn latest_version(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Option<String>, ResolveError> {
        Ok(self
            .enumerate_versions(coordinate, use_cache)
            .await?
            .into_iter()
            .next())
    }

    async fn fetch_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<RawDocument, ResolveError> {
        Ok(RawDocument::Json(self.registration_index(coordinate, use_cache).await?))
    }

    async fn resolve_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<NormalizedMetadata, ResolveError> {
        let pinned = pin_version(self, coordinate, use_cache).await?;
        let version = pinned.version().unwrap_or_default();

        let index = self.registration_index(coordinate, use_cache).await?;
        let leaf = self
            .registration_leaf(coordinate, &index, version, use_cache)
            .await?;
        let Some(leaf) = leaf else {
            return Err(ResolveError::not_found(&pinned));
        };

        let mut metadata = self.normalize(coordinate, version, &leaf);
        metadata.latest_version = self.latest_version(coordinate, use_cache).await?;

        let entry = leaf.get("catalogEntry").unwrap_or(&Value::Null);
        let repository_url = match repository_url(entry) {
            Some(url) => Some(url),
            None => self.nuspec_repository(coordinate, version, use_cache).await,
        };
        metadata.source_repository = repository::infer(&pinned, repository_url)
            .into_iter()
            .next();

        Ok(metadata)
    }

    fn artifact_locations(&self, coordinate: &Coordinate) -> Vec<ArtifactLocation> {
        match coordinate.version() {
            Some(version) => vec![ArtifactLocation::new(
                ArtifactKind::Package,
                self.package_file_url(coordinate, version, "nupkg"),
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
