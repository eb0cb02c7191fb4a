//! npm registry provider
//!
//! The registry serves one document per package holding every version,
//! its `dist-tags` and publish times.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::config::DEFAULT_NPM_URL;
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
use crate::version::schemes::NpmScheme;

/// Dependency maps of a version document and the scope each maps to
const DEPENDENCY_KINDS: &[(&str, Option<&str>)] = &[
    ("dependencies", None),
    ("devDependencies", Some("dev")),
    ("peerDependencies", Some("peer")),
    ("optionalDependencies", Some("optional")),
];

pub struct NpmProvider {
    context: ProviderContext,
    base_url: String,
}

impl NpmProvider {
    pub fn new(context: ProviderContext, base_url: &str) -> Self {
        Self {
            context,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(coordinate: &Coordinate) -> String {
        // Scoped package: @scope/name -> @scope%2Fname
        coordinate.full_name().replace('/', "%2F")
    }

    fn package_url(&self, coordinate: &Coordinate) -> String {
        format!("{}/{}", self.base_url, Self::encode_package_name(coordinate))
    }

    async fn package_document(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Value, ResolveError> {
        let url = self.package_url(coordinate);
        let document = self
            .context
            .cache
            .get_json(&url, use_cache)
            .await
            .map_err(fetch_failed(coordinate))?;
        if !document.is_object() {
            warn!("npm registry returned a non-object document: {}", url);
            return Err(ResolveError::parse(coordinate, "package document is not an object"));
        }
        Ok(document)
    }

    fn package_versions(document: &Value) -> PackageVersions {
        let versions = document
            .get("versions")
            .and_then(Value::as_object)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default();
        let dist_tags = document
            .get("dist-tags")
            .and_then(Value::as_object)
            .map(|tags| {
                tags.iter()
                    .filter_map(|(tag, version)| Some((tag.clone(), version.as_str()?.to_string())))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();
        PackageVersions::with_dist_tags(versions, dist_tags)
    }

    fn tarball_url(&self, coordinate: &Coordinate, version: &str) -> String {
        format!(
            "{}/{}/-/{}-{}.tgz",
            self.base_url,
            coordinate.full_name(),
            coordinate.name(),
            version
        )
    }

    fn normalize(
        &self,
        coordinate: &Coordinate,
        document: &Value,
        manifest: &Value,
        version: &str,
    ) -> NormalizedMetadata {
        let mut metadata = NormalizedMetadata::new(coordinate, version);

        metadata.description = json_str(manifest, "description")
            .or_else(|| json_str(document, "description"))
            .map(String::from);
        metadata.homepage = json_str(manifest, "homepage")
            .or_else(|| json_str(document, "homepage"))
            .map(String::from);
        metadata.publish_time = document
            .get("time")
            .and_then(|time| json_str(time, version))
            .and_then(parse_time);

        if let Some(keywords) = manifest.get("keywords") {
            match keywords {
                Value::Array(items) => {
                    metadata.add_keywords(items.iter().filter_map(Value::as_str))
                }
                Value::String(text) => metadata.add_keywords(text.split([',', ' '])),
                _ => {}
            }
        }

        metadata.licenses = licenses(manifest);
        metadata.authors = authors(manifest);
        metadata.dependencies = dependencies(manifest);

        let dist = manifest.get("dist").unwrap_or(&Value::Null);
        let tarball = json_str(dist, "tarball")
            .map(String::from)
            .unwrap_or_else(|| self.tarball_url(coordinate, version));
        metadata.source_artifact_uri = Some(tarball.clone());
        metadata.package_uri = Some(tarball);
        metadata.package_metadata_uri =
            Some(format!("{}/{}", self.package_url(coordinate), version));

        if let Some(shasum) = json_str(dist, "shasum") {
            metadata.digests.push(Digest::new("sha1", shasum));
        }
        if let Some(digest) = json_str(dist, "integrity").and_then(Digest::from_integrity)
            && !metadata.digests.contains(&digest)
        {
            metadata.digests.push(digest);
        }

        // The package-level repository stands in only for versionless requests
        let mut repository_urls = vec![repository_url(manifest)];
        if coordinate.version().is_none() {
            repository_urls.push(repository_url(document));
        }
        metadata.source_repository = repository::infer(
            &coordinate.with_version(version),
            repository_urls.into_iter().flatten(),
        )
        .into_iter()
        .next();

        metadata
    }
}

impl Default for NpmProvider {
    fn default() -> Self {
        Self::new(ProviderContext::default(), DEFAULT_NPM_URL)
    }
}

/// `repository` as a plain string or a `{ "type", "url" }` object
fn repository_url(document: &Value) -> Option<String> {
    match document.get("repository")? {
        Value::String(url) => Some(url.clone()),
        repository @ Value::Object(_) => json_str(repository, "url").map(String::from),
        _ => None,
    }
}

fn license(value: &Value) -> Option<License> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(License {
            name: Some(name.trim().to_string()),
            url: None,
        }),
        Value::Object(_) => {
            let license = License {
                name: json_str(value, "type").map(String::from),
                url: json_str(value, "url").map(String::from),
            };
            (license.name.is_some() || license.url.is_some()).then_some(license)
        }
        _ => None,
    }
}

/// `license` (string or object) plus the legacy `licenses` array
fn licenses(manifest: &Value) -> Vec<License> {
    let mut licenses: Vec<License> = manifest
        .get("license")
        .and_then(license)
        .into_iter()
        .collect();
    if let Some(Value::Array(items)) = manifest.get("licenses") {
        licenses.extend(items.iter().filter_map(license));
    }
    licenses
}

fn party(value: &Value, role: &str) -> Option<Party> {
    let party = match value {
        Value::String(text) => Party::parse(text)?,
        Value::Object(_) => Party::new(json_str(value, "name")?)
            .with_email(json_str(value, "email").map(String::from)),
        _ => return None,
    };
    Some(party.with_role(role))
}

fn authors(manifest: &Value) -> Vec<Party> {
    let mut parties: Vec<Party> = manifest
        .get("author")
        .and_then(|author| party(author, "author"))
        .into_iter()
        .collect();
    for (field, role) in [("contributors", "contributor"), ("maintainers", "maintainer")] {
        if let Some(Value::Array(items)) = manifest.get(field) {
            parties.extend(items.iter().filter_map(|item| party(item, role)));
        }
    }
    parties
}

/// Package coordinate of a dependency name, splitting off an `@scope`
fn dependency_coordinate(name: &str) -> Option<Coordinate> {
    match name.strip_prefix('@').and_then(|scoped| scoped.split_once('/')) {
        Some((scope, name)) => Coordinate::new(Ecosystem::Npm, name)
            .ok()
            .map(|c| c.with_namespace(format!("@{}", scope))),
        None => Coordinate::new(Ecosystem::Npm, name).ok(),
    }
}

fn dependencies(manifest: &Value) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    for (field, scope) in DEPENDENCY_KINDS {
        let Some(entries) = manifest.get(*field).and_then(Value::as_object) else {
            continue;
        };
        for (name, constraint) in entries {
            let Some(package) = dependency_coordinate(name) else {
                continue;
            };
            dependencies.push(Dependency {
                package,
                constraint: constraint.as_str().map(String::from),
                scope: scope.map(String::from),
            });
        }
    }
    dependencies
}

#[async_trait::async_trait]
impl Provider for NpmProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn enumerate_versions(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Vec<String>, ResolveError> {
        let document = self.package_document(coordinate, use_cache).await?;
        Ok(Self::package_versions(&document).sorted(&NpmScheme))
    }

    async fn latest_version(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Option<String>, ResolveError> {
        let document = self.package_document(coordinate, use_cache).await?;
        Ok(Self::package_versions(&document).latest(&NpmScheme))
    }

    async fn fetch_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<RawDocument, ResolveError> {
        Ok(RawDocument::Json(self.package_document(coordinate, use_cache).await?))
    }

    async fn resolve_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<NormalizedMetadata, ResolveError> {
        let pinned = pin_version(self, coordinate, use_cache).await?;
        let version = pinned.version().unwrap_or_default();

        let document = self.package_document(coordinate, use_cache).await?;
        let manifest = document
            .get("versions")
            .and_then(|versions| versions.get(version));
        let Some(manifest) = manifest else {
            return Err(ResolveError::not_found(&pinned));
        };

        let mut metadata = self.normalize(coordinate, &document, manifest, version);
        metadata.latest_version = Self::package_versions(&document).latest(&NpmScheme);
        Ok(metadata)
    }

    fn artifact_locations(&self, coordinate: &Coordinate) -> Vec<ArtifactLocation> {
        match coordinate.version() {
            Some(version) => vec![ArtifactLocation::new(
                ArtifactKind::Package,
                self.tarball_url(coordinate, version),
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
