//! Resolver facade
//!
//! Dispatches coordinates to the provider registered for their ecosystem.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::config::{
    DEFAULT_HACKAGE_URL, DEFAULT_NPM_URL, DEFAULT_NUGET_URL, DEFAULT_PYPI_FILES_URL,
    DEFAULT_PYPI_URL, ResolverConfig,
};
use crate::download::{ArchiveExtractor, DownloadOptions, Downloaded};
use crate::error::{CacheError, DownloadError, ResolveError};
use crate::http::HttpCache;
use crate::metadata::NormalizedMetadata;
use crate::provider::{
    ArtifactLocation, HackageProvider, NpmProvider, NugetProvider, Provider, ProviderContext,
    PypiProvider,
};
use crate::purl::{Coordinate, Ecosystem};

/// Entry point for resolving package coordinates across ecosystems
pub struct Resolver {
    providers: HashMap<Ecosystem, Arc<dyn Provider>>,
    use_cache: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            use_cache: true,
        }
    }

    /// Bypass cached documents on every call (fresh documents are still stored)
    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Register `provider` for its ecosystem, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.ecosystem(), provider);
    }

    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        let mut ecosystems: Vec<Ecosystem> = self.providers.keys().copied().collect();
        ecosystems.sort();
        ecosystems
    }

    /// Provider registered for `ecosystem`
    pub fn provider(&self, ecosystem: Ecosystem) -> Result<&Arc<dyn Provider>, ResolveError> {
        self.providers
            .get(&ecosystem)
            .ok_or_else(|| ResolveError::UnsupportedEcosystem {
                ecosystem,
                coordinate: format!("pkg:{}", ecosystem),
            })
    }

    fn provider_for(&self, coordinate: &Coordinate) -> Result<&Arc<dyn Provider>, ResolveError> {
        self.providers
            .get(&coordinate.ecosystem())
            .ok_or_else(|| ResolveError::UnsupportedEcosystem {
                ecosystem: coordinate.ecosystem(),
                coordinate: coordinate.to_string(),
            })
    }

    /// Normalized metadata of the coordinate (its latest version when it has none)
    pub async fn resolve(
        &self,
        coordinate: &Coordinate,
    ) -> Result<NormalizedMetadata, ResolveError> {
        self.provider_for(coordinate)?
            .resolve_metadata(coordinate, self.use_cache)
            .await
    }

    /// Resolve independent coordinates concurrently, one result per input in order
    pub async fn resolve_all(
        &self,
        coordinates: &[Coordinate],
    ) -> Vec<Result<NormalizedMetadata, ResolveError>> {
        join_all(coordinates.iter().map(|coordinate| self.resolve(coordinate))).await
    }

    /// Known versions, newest first
    pub async fn versions(&self, coordinate: &Coordinate) -> Result<Vec<String>, ResolveError> {
        self.provider_for(coordinate)?
            .enumerate_versions(coordinate, self.use_cache)
            .await
    }

    pub fn artifacts(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Vec<ArtifactLocation>, ResolveError> {
        Ok(self.provider_for(coordinate)?.artifact_locations(coordinate))
    }

    pub async fn download(
        &self,
        coordinate: &Coordinate,
        options: &DownloadOptions,
    ) -> Result<Downloaded, DownloadError> {
        self.provider_for(coordinate)?
            .download(coordinate, options)
            .await
    }

    /// Download for batch callers: failures are logged and yield no paths
    pub async fn download_or_empty(
        &self,
        coordinate: &Coordinate,
        options: &DownloadOptions,
    ) -> Vec<PathBuf> {
        match self.download(coordinate, options).await {
            Ok(downloaded) => downloaded.paths,
            Err(e) => {
                warn!("Download of {} failed: {}", coordinate, e);
                Vec::new()
            }
        }
    }
}

/// Create a resolver with every enabled registry sharing one document cache
pub fn create_default_resolver(config: &ResolverConfig) -> Result<Resolver, CacheError> {
    let cache = Arc::new(HttpCache::from_config(&config.cache)?);
    let context = ProviderContext::new(cache, Arc::new(ArchiveExtractor));
    let registries = &config.registries;
    let mut resolver = Resolver::new();

    if registries.npm.enabled {
        resolver.register(Arc::new(NpmProvider::new(
            context.clone(),
            &registries.npm.base_url_or(DEFAULT_NPM_URL),
        )));
    }

    if registries.nuget.enabled {
        resolver.register(Arc::new(NugetProvider::new(
            context.clone(),
            &registries.nuget.base_url_or(DEFAULT_NUGET_URL),
        )));
    }

    if registries.hackage.enabled {
        resolver.register(Arc::new(HackageProvider::new(
            context.clone(),
            &registries.hackage.base_url_or(DEFAULT_HACKAGE_URL),
        )));
    }

    if registries.pypi.enabled {
        let files_url = registries
            .pypi
            .files_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_PYPI_FILES_URL);
        resolver.register(Arc::new(PypiProvider::new(
            context,
            &registries.pypi.base_url_or(DEFAULT_PYPI_URL),
            files_url,
        )));
    }

    Ok(resolver)
}
