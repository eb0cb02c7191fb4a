//! Ecosystem providers
//!
//! Each provider adapts one registry to the [`Provider`] contract: version
//! enumeration, metadata resolution, artifact locations and downloads.

pub mod cabal;
pub mod hackage;
pub mod npm;
pub mod nuget;
pub mod pypi;

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::download::{
    ArchiveExtractor, DownloadOptions, Downloaded, Extractor, download_artifact,
};
use crate::error::{DownloadError, FetchError, ResolveError};
use crate::http::HttpCache;
use crate::metadata::NormalizedMetadata;
use crate::purl::{Coordinate, Ecosystem};

pub use hackage::HackageProvider;
pub use npm::NpmProvider;
pub use nuget::NugetProvider;
pub use pypi::PypiProvider;

/// Shared services handed to every provider
#[derive(Clone)]
pub struct ProviderContext {
    pub cache: Arc<HttpCache>,
    pub extractor: Arc<dyn Extractor>,
}

impl ProviderContext {
    pub fn new(cache: Arc<HttpCache>, extractor: Arc<dyn Extractor>) -> Self {
        Self { cache, extractor }
    }
}

impl Default for ProviderContext {
    fn default() -> Self {
        Self::new(Arc::new(HttpCache::new()), Arc::new(ArchiveExtractor))
    }
}

/// A registry's own metadata document
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    Json(serde_json::Value),
    /// Plain text documents such as `.cabal` files
    Text(String),
}

impl RawDocument {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            RawDocument::Json(value) => Some(value),
            RawDocument::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawDocument::Json(_) => None,
            RawDocument::Text(text) => Some(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The package as the registry distributes it (`.tgz`, `.nupkg`)
    Package,
    /// A source distribution (`.tar.gz`)
    Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    pub kind: ArtifactKind,
    pub uri: String,
}

impl ArtifactLocation {
    pub fn new(kind: ArtifactKind, uri: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
        }
    }
}

/// Uniform contract over one package ecosystem
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// The ecosystem this provider serves
    fn ecosystem(&self) -> Ecosystem;

    /// All known versions of the package, newest first
    ///
    /// # Returns
    /// * `Err(ResolveError::NotFound)` - the registry does not know the package
    /// * `Err(ResolveError::Transport)` - the registry could not be reached
    async fn enumerate_versions(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Vec<String>, ResolveError>;

    /// The version the registry declares latest, else the first of
    /// `enumerate_versions`. `None` when the package has no versions.
    async fn latest_version(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<Option<String>, ResolveError>;

    /// The registry's native metadata document for the package
    ///
    /// Package-level where the registry serves every version in one document,
    /// version-specific (the latest version when none is given) otherwise.
    async fn fetch_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<RawDocument, ResolveError>;

    /// Normalized metadata of the coordinate's version, or of the latest
    /// version when the coordinate has none
    async fn resolve_metadata(
        &self,
        coordinate: &Coordinate,
        use_cache: bool,
    ) -> Result<NormalizedMetadata, ResolveError>;

    /// Download locations of a version-qualified coordinate. Never touches
    /// the network; a versionless coordinate has no locations.
    fn artifact_locations(&self, coordinate: &Coordinate) -> Vec<ArtifactLocation>;

    /// Download (and optionally extract) the coordinate's primary artifact
    async fn download(
        &self,
        coordinate: &Coordinate,
        options: &DownloadOptions,
    ) -> Result<Downloaded, DownloadError>;
}

/// Pin a versionless coordinate to the provider's latest version
pub(crate) async fn pin_version<P: Provider + ?Sized>(
    provider: &P,
    coordinate: &Coordinate,
    use_cache: bool,
) -> Result<Coordinate, ResolveError> {
    if coordinate.version().is_some() {
        return Ok(coordinate.clone());
    }
    match provider.latest_version(coordinate, use_cache).await? {
        Some(version) => Ok(coordinate.with_version(version)),
        None => Err(ResolveError::not_found(coordinate)),
    }
}

/// Download through the shared state machine after pinning the version
pub(crate) async fn download_pinned<P: Provider + ?Sized>(
    provider: &P,
    context: &ProviderContext,
    coordinate: &Coordinate,
    options: &DownloadOptions,
) -> Result<Downloaded, DownloadError> {
    let coordinate = pin_version(provider, coordinate, options.use_cache).await?;
    let locations = provider.artifact_locations(&coordinate);
    download_artifact(
        &context.cache,
        &context.extractor,
        &coordinate,
        &locations,
        options,
    )
    .await
}

/// Map a fetch failure onto the coordinate being resolved
pub(crate) fn fetch_failed(
    coordinate: &Coordinate,
) -> impl Fn(FetchError) -> ResolveError + '_ {
    move |error| ResolveError::from_fetch(coordinate, error)
}
