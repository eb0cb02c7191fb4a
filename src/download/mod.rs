//! Artifact download
//!
//! One state machine shared by every provider:
//!
//! ```text
//! NotStarted -> Fetching -> CachedHit ------------------> Done
//!                        -> Fetched -> Extracted -------> Done
//!                                   -> RawWritten ------> Done
//!                        -> Failed ---------------------> Done
//! ```
//!
//! Targets are deterministic: `{root}/{ecosystem}-{name}@{version}` for an
//! extraction and `{root}/{ecosystem}-{name}@{version}.{ext}` for a raw write.

pub mod extract;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::http::HttpCache;
use crate::provider::ArtifactLocation;
use crate::purl::Coordinate;

pub use extract::{ArchiveExtractor, Extractor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Directory downloads are placed under
    pub root: PathBuf,
    /// Unpack the artifact instead of writing it as is
    pub extract: bool,
    /// Reuse a previous extraction found at the target
    pub use_cache: bool,
}

impl DownloadOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extract: true,
            use_cache: true,
        }
    }

    pub fn with_extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOrigin {
    /// A previous extraction was reused, nothing was fetched
    CachedHit,
    Fetched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub paths: Vec<PathBuf>,
    pub origin: DownloadOrigin,
}

/// `{ecosystem}-{namespace}-{name}@{version}` with `/` in the namespace
/// replaced by `-`, case-folded where the ecosystem ignores case
pub fn target_name(coordinate: &Coordinate, version: &str) -> String {
    let ecosystem = coordinate.ecosystem();
    let name = ecosystem.fold(&coordinate.full_name()).replace('/', "-");
    format!("{}-{}@{}", ecosystem, name, version)
}

/// File extension of an artifact URL, keeping compound `.tar.gz`
pub fn artifact_extension(uri: &str) -> Option<&str> {
    let file = uri.rsplit('/').next()?.split(['?', '#']).next()?;
    if file.ends_with(".tar.gz") {
        return Some("tar.gz");
    }
    Path::new(file).extension().and_then(|e| e.to_str())
}

async fn is_populated(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

/// Download the first of `locations` for a version-qualified `coordinate`
pub async fn download_artifact(
    cache: &HttpCache,
    extractor: &Arc<dyn Extractor>,
    coordinate: &Coordinate,
    locations: &[ArtifactLocation],
    options: &DownloadOptions,
) -> Result<Downloaded, DownloadError> {
    let Some(version) = coordinate.version() else {
        return Err(DownloadError::NoArtifact(coordinate.to_string()));
    };
    let target = options.root.join(target_name(coordinate, version));

    if options.extract && options.use_cache && is_populated(&target).await {
        info!("Reusing extracted {} at {}", coordinate, target.display());
        return Ok(Downloaded {
            paths: vec![target],
            origin: DownloadOrigin::CachedHit,
        });
    }

    let Some(location) = locations.first() else {
        warn!("No artifact location for {}", coordinate);
        return Err(DownloadError::NoArtifact(coordinate.to_string()));
    };

    debug!("Fetching {} from {}", coordinate, location.uri);
    let bytes = cache.fetch_bytes(&location.uri).await.map_err(|source| {
        warn!("Failed to download {}: {}", coordinate, source);
        DownloadError::Fetch {
            coordinate: coordinate.to_string(),
            source,
        }
    })?;
    debug!("Fetched {} bytes for {}", bytes.len(), coordinate);

    tokio::fs::create_dir_all(&options.root).await?;

    if options.extract {
        let extractor = Arc::clone(extractor);
        let destination = target.clone();
        let path = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &destination))
            .await?
            .map_err(|source| {
                warn!("Failed to extract {}: {}", coordinate, source);
                DownloadError::Extract {
                    coordinate: coordinate.to_string(),
                    source,
                }
            })?;
        info!("Extracted {} to {}", coordinate, path.display());
        return Ok(Downloaded {
            paths: vec![path],
            origin: DownloadOrigin::Fetched,
        });
    }

    let file_name = match artifact_extension(&location.uri) {
        Some(ext) => format!("{}.{}", target_name(coordinate, version), ext),
        None => target_name(coordinate, version),
    };
    let path = options.root.join(file_name);
    tokio::fs::write(&path, &bytes).await.inspect_err(|e| {
        warn!("Failed to write {}: {}", path.display(), e);
    })?;
    info!("Saved {} to {}", coordinate, path.display());

    Ok(Downloaded {
        paths: vec![path],
        origin: DownloadOrigin::Fetched,
    })
}
