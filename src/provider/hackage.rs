//! Hackage provider
//!
//! Versions come from the `preferred` JSON listing. Metadata is the
//! per-version `.cabal` file, so [`Provider::fetch_metadata`] is
//! version-specific here.

use serde::Deserialize;
use tracing::warn;

use crate::config::DEFAULT_HACKAGE_URL;
use crate::download::{DownloadOptions, Downloaded};
use crate::error::{DownloadError, ResolveError};
use crate::metadata::{Dependency, License, NormalizedMetadata, Party};
use crate::provider::cabal::CabalFile;
use crate::provider::{
    ArtifactKind, ArtifactLocation, Provider, ProviderContext, RawDocument, download_pinned,
    fetch_failed, pin_version,
};
use crate::purl::{Coordinate, Ecosystem};
use crate::repository;
use crate::version::schemes::HackageScheme;
use crate::version::sort_descending;

/// Response from the `/package/{name}/preferred` endpoint
#[derive(Debug, Default, Deserialize)]
struct PreferredVersions {
    #[serde(rename = "normal-version", default)]
    normal: Vec<String>,
    #[serde(rename = "deprecated-version", default)]
    deprecated: Vec<String>,
}

impl PreferredVersions {
    /// Newest normal version; deprecated releases count only when nothing else exists
    fn latest(&self) -> Option<String> {
        sort_descending(&HackageScheme, &self.normal)
            .into_iter()
            .next()
            .or_else(|| {
                sort_descending(&HackageScheme, &self.deprecated)
                    .into_iter()
                    .next()
            })
    }
}

pub struct HackageProvider {
    context: ProviderContext,
    base_url: String,
}

impl HackageProvider {
    pub fn new(context: ProviderContext, base_url: &str) -> Self {
        Self {
            context,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn cabal_url(&self, name: &str, version: &str) -> String {
        format!("{}/package/{}-{}/{}.cabal", self.base_url, name, version, name)
    }

    fn tarball_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/package/{}-{}/{}-{}.tar.gz",
            self.base_url, name, version, name, version
        )
    }

    async fn preferred(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<PreferredVersions, ResolveError> {
        let url = format!("{}/package/{}/preferred", self.base_url, coordinate.name());
        let document = self
            .context
            .cache
            .get_json(&url, use_cache)
            .await
            .map_err(fetch_failed(coordinate))?;
        serde_json::from_value(document).map_err(|e| {
            warn!("Failed to parse Hackage preferred versions: {}", e);
            ResolveError::parse(coordinate, e.to_string())
        })
    }

    async fn cabal_file(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<(Coordinate, String), ResolveError> {
        let pinned = pin_version(self, coordinate, use_cache).await?;
        let version = pinned.version().unwrap_or_default();
        let text = self
            .context
            .cache
            .get_text(&self.cabal_url(coordinate.name(), version), use_cache)
            .await
            .map_err(fetch_failed(&pinned))?;
        Ok((pinned, text))
    }

    fn normalize(
        &self,
        coordinate: &Coordinate,
        version: &str,
        file: &CabalFile,
    ) -> NormalizedMetadata {
        let name = coordinate.name();
        let mut metadata = NormalizedMetadata::new(coordinate, version);

        metadata.description = file
            .field("synopsis")
            .or_else(|| file.field("description"))
            .map(String::from);
        metadata.homepage = file.field("homepage").map(String::from);
        if let Some(category) = file.field("category") {
            metadata.add_keywords(category.split(','));
        }
        if let Some(license) = file.field("license") {
            metadata.licenses.push(License {
                name: Some(license.to_string()),
                url: None,
            });
        }
        for (field, role) in [("author", "author"), ("maintainer", "maintainer")] {
            if let Some(value) = file.field(field) {
                metadata.authors.extend(
                    value
                        .split(',')
                        .filter_map(Party::parse)
                        .map(|party| party.with_role(role)),
                );
            }
        }

        for (section, dependency, constraint) in file.build_depends() {
            let Ok(package) = Coordinate::new(Ecosystem::Hackage, dependency) else {
                continue;
            };
            let scope = (section != "library").then(|| section.to_string());
            let duplicate = metadata
                .dependencies
                .iter()
                .any(|d| d.package == package && d.scope == scope);
            if !duplicate {
                metadata.dependencies.push(Dependency {
                    package,
                    constraint,
                    scope,
                });
            }
        }

        let tarball = self.tarball_url(name, version);
        metadata.source_artifact_uri = Some(tarball.clone());
        metadata.package_uri = Some(tarball);
        metadata.package_metadata_uri = Some(self.cabal_url(name, version));

        metadata.source_repository = repository::infer(
            &coordinate.with_version(version),
            file.source_repository(),
        )
        .into_iter()
        .next();

        metadata
    }
}

impl Default for HackageProvider {
    fn default() -> Self {
        Self::new(ProviderContext::default(), DEFAULT_HACKAGE_URL)
    }
}

#[async_trait::async_trait]
impl Provider for HackageProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Hackage
    }

    async fn enumerate_versions(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Vec<String>, ResolveError> {
        let preferred = self.preferred(coordinate, use_cache).await?;
        Ok(sort_descending(
            &HackageScheme,
            preferred.normal.iter().chain(&preferred.deprecated),
        ))
    }

    async fn latest_version(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Option<String>, ResolveError> {
        Ok(self.preferred(coordinate, use_cache).await?.latest())
    }

    async fn fetch_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<RawDocument, ResolveError> {
        let (_, text) = self.cabal_file(coordinate, use_cache).await?;
        Ok(RawDocument::Text(text))
    }

    async fn resolve_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<NormalizedMetadata, ResolveError> {
        let (pinned, text) = self.cabal_file(coordinate, use_cache).await?;
        let version = pinned.version().unwrap_or_default();

        let file = CabalFile::parse(&text);
        if file.field("name").is_none() {
            warn!("Hackage returned a document without a package name: {}", pinned);
            return Err(ResolveError::parse(&pinned, "not a cabal file"));
        }

        let mut metadata = self.normalize(coordinate, version, &file);

        metadata.latest_version = self.latest_version(coordinate, use_cache).await?;

        Ok(metadata)
    }

    fn artifact_locations(&self, coordinate: &Coordinate) -> Vec<ArtifactLocation> {
        match coordinate.version() {
            Some(version) => vec![ArtifactLocation::new(
                ArtifactKind::Source,
                self.tarball_url(coordinate.name(), version),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Server;

    const PREFERRED: &str = r#"{
        "normal-version": ["2.2.1.0", "2.2.0.0", "2.1.2.1"],
        "deprecated-version": ["2.2.2.0"]
    }"#;

    const CABAL: &str = "\
name:               aeson
version:            2.2.1.0
synopsis:           Fast JSON parsing and encoding
homepage:           https://github.com/haskell/aeson
license:            BSD-3-Clause
author:             Bryan O'Sullivan <bos@serpentine.com>
maintainer:         Adam Bergmark <adam@bergmark.nl>, Oleg Grenrus <oleg.grenrus@iki.fi>
category:           Text, Web, JSON

library
  build-depends:
      base >=4.10.0.0 && <5
    , text >=1.2.3.0

test-suite aeson-tests
  build-depends: base, aeson

source-repository head
  type:     git
  location: git://github.com/haskell/aeson.git
";

    fn provider(server: &Server) -> HackageProvider {
        HackageProvider::new(ProviderContext::default(), &server.url())
    }

    async fn mock_preferred(server: &mut Server) -> mockito::Mock {
        server
            .mock("GET", "/package/aeson/preferred")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PREFERRED)
            .expect(1)
            .create_async()
            .await
    }

    fn aeson(version: Option<&str>) -> Coordinate {
        let coordinate = Coordinate::new(Ecosystem::Hackage, "aeson").unwrap();
        match version {
            Some(version) => coordinate.with_version(version),
            None => coordinate,
        }
    }

    #[tokio::test]
    async fn enumerate_versions_merges_normal_and_deprecated() {
        let mut server = Server::new_async().await;
        let mock = mock_preferred(&mut server).await;

        let versions = provider(&server)
            .enumerate_versions(&aeson(None), true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(versions, vec!["2.2.2.0", "2.2.1.0", "2.2.0.0", "2.1.2.1"]);
    }

    #[tokio::test]
    async fn resolve_metadata_parses_cabal_file() {
        let mut server = Server::new_async().await;
        let preferred = mock_preferred(&mut server).await;
        let cabal = server
            .mock("GET", "/package/aeson-2.2.1.0/aeson.cabal")
            .with_status(200)
            .with_body(CABAL)
            .expect(1)
            .create_async()
            .await;

        let metadata = provider(&server)
            .resolve_metadata(&aeson(Some("2.2.1.0")), true)
            .await
            .unwrap();

        cabal.assert_async().await;
        preferred.assert_async().await;
        assert_eq!(metadata.version, "2.2.1.0");
        assert_eq!(metadata.latest_version.as_deref(), Some("2.2.1.0"));
        assert_eq!(metadata.description.as_deref(), Some("Fast JSON parsing and encoding"));
        assert_eq!(
            metadata.keywords.iter().collect::<Vec<_>>(),
            vec!["Text", "Web", "JSON"]
        );
        assert_eq!(metadata.licenses[0].name.as_deref(), Some("BSD-3-Clause"));
        let authors: Vec<_> = metadata
            .authors
            .iter()
            .map(|a| (a.name.as_str(), a.role.as_deref()))
            .collect();
        assert_eq!(
            authors,
            vec![
                ("Bryan O'Sullivan", Some("author")),
                ("Adam Bergmark", Some("maintainer")),
                ("Oleg Grenrus", Some("maintainer")),
            ]
        );
        let dependencies: Vec<_> = metadata
            .dependencies
            .iter()
            .map(|d| (d.package.name(), d.scope.as_deref()))
            .collect();
        assert_eq!(
            dependencies,
            vec![
                ("base", None),
                ("text", None),
                ("base", Some("test-suite")),
                ("aeson", Some("test-suite")),
            ]
        );
        assert_eq!(
            metadata.package_uri,
            Some(format!("{}/package/aeson-2.2.1.0/aeson-2.2.1.0.tar.gz", server.url()))
        );
        assert_eq!(
            metadata.source_repository.unwrap().coordinate.to_string(),
            "pkg:github/haskell/aeson"
        );
    }

    #[tokio::test]
    async fn resolve_metadata_without_version_skips_deprecated_release() {
        let mut server = Server::new_async().await;
        let preferred = mock_preferred(&mut server).await;
        let cabal = server
            .mock("GET", "/package/aeson-2.2.1.0/aeson.cabal")
            .with_status(200)
            .with_body(CABAL)
            .expect(1)
            .create_async()
            .await;

        let metadata = provider(&server)
            .resolve_metadata(&aeson(None), true)
            .await
            .unwrap();

        preferred.assert_async().await;
        cabal.assert_async().await;
        assert_eq!(metadata.version, "2.2.1.0");
        assert_eq!(metadata.latest_version.as_deref(), Some("2.2.1.0"));
    }

    #[tokio::test]
    async fn latest_version_falls_back_to_deprecated_releases() {
        let mut server = Server::new_async().await;
        let _preferred = server
            .mock("GET", "/package/aeson/preferred")
            .with_status(200)
            .with_body(r#"{"deprecated-version": ["0.9.0.0", "0.11.0.0"]}"#)
            .create_async()
            .await;

        let latest = provider(&server)
            .latest_version(&aeson(None), true)
            .await
            .unwrap();

        assert_eq!(latest.as_deref(), Some("0.11.0.0"));
    }

    #[tokio::test]
    async fn resolve_metadata_maps_builtin_library_to_ghc_tree() {
        let mut server = Server::new_async().await;
        let _cabal = server
            .mock("GET", "/package/base-4.19.0.0/base.cabal")
            .with_status(200)
            .with_body("name: base\nversion: 4.19.0.0\n")
            .create_async()
            .await;
        let _preferred = server
            .mock("GET", "/package/base/preferred")
            .with_status(200)
            .with_body(r#"{"normal-version": ["4.19.0.0"]}"#)
            .create_async()
            .await;
        let base = Coordinate::new(Ecosystem::Hackage, "base")
            .unwrap()
            .with_version("4.19.0.0");

        let metadata = provider(&server).resolve_metadata(&base, true).await.unwrap();

        assert_eq!(
            metadata.source_repository.unwrap().coordinate.to_string(),
            "pkg:gitlab/ghc/ghc?repository_url=https%3A%2F%2Fgitlab.haskell.org#libraries/base"
        );
    }

    #[tokio::test]
    async fn resolve_metadata_returns_not_found_for_missing_version() {
        let mut server = Server::new_async().await;
        let _cabal = server
            .mock("GET", "/package/aeson-0.0.0.1/aeson.cabal")
            .with_status(404)
            .create_async()
            .await;

        let error = provider(&server)
            .resolve_metadata(&aeson(Some("0.0.0.1")), true)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.coordinate(), "pkg:hackage/aeson@0.0.0.1");
    }

    #[tokio::test]
    async fn fetch_metadata_returns_cabal_text() {
        let mut server = Server::new_async().await;
        let _cabal = server
            .mock("GET", "/package/aeson-2.2.1.0/aeson.cabal")
            .with_status(200)
            .with_body(CABAL)
            .create_async()
            .await;

        let document = provider(&server)
            .fetch_metadata(&aeson(Some("2.2.1.0")), true)
            .await
            .unwrap();

        assert!(document.as_text().unwrap().starts_with("name:"));
    }

    #[test]
    fn artifact_locations_point_at_source_tarball() {
        let provider = HackageProvider::default();

        assert_eq!(
            provider.artifact_locations(&aeson(Some("2.2.1.0"))),
            vec![ArtifactLocation::new(
                ArtifactKind::Source,
                "https://hackage.haskell.org/package/aeson-2.2.1.0/aeson-2.2.1.0.tar.gz"
            )]
        );
    }
}
