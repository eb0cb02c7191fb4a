use thiserror::Error;

use crate::purl::{Coordinate, Ecosystem};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PurlError {
    #[error("Missing 'pkg:' scheme: {0}")]
    MissingScheme(String),

    #[error("Missing package type: {0}")]
    MissingType(String),

    #[error("Unknown package type '{0}'")]
    UnknownType(String),

    #[error("Package name must not be empty: {0}")]
    EmptyName(String),

    #[error("Invalid percent-encoding in '{0}'")]
    Encoding(String),
}

/// Failure of a single HTTP request. Never cached.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid document from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// HTTP status code, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            FetchError::Decode { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404) | Some(410))
    }
}

/// Error kinds surfaced to callers of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Transport,
    Parse,
    UnsupportedEcosystem,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Package not found: {coordinate}")]
    NotFound { coordinate: String },

    #[error("Transport error while resolving {coordinate}: {source}")]
    Transport {
        coordinate: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid response while resolving {coordinate}: {message}")]
    Parse { coordinate: String, message: String },

    #[error("Unsupported ecosystem '{ecosystem}': {coordinate}")]
    UnsupportedEcosystem {
        ecosystem: Ecosystem,
        coordinate: String,
    },
}

impl ResolveError {
    pub fn not_found(coordinate: &Coordinate) -> Self {
        ResolveError::NotFound {
            coordinate: coordinate.to_string(),
        }
    }

    pub fn parse(coordinate: &Coordinate, message: impl Into<String>) -> Self {
        ResolveError::Parse {
            coordinate: coordinate.to_string(),
            message: message.into(),
        }
    }

    /// Classify a failed fetch made on behalf of `coordinate`
    pub fn from_fetch(coordinate: &Coordinate, error: FetchError) -> Self {
        if error.is_not_found() {
            return Self::not_found(coordinate);
        }
        match error {
            FetchError::Decode { source, .. } => Self::parse(coordinate, source.to_string()),
            other => ResolveError::Transport {
                coordinate: coordinate.to_string(),
                source: other,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound { .. } => ErrorKind::NotFound,
            ResolveError::Transport { .. } => ErrorKind::Transport,
            ResolveError::Parse { .. } => ErrorKind::Parse,
            ResolveError::UnsupportedEcosystem { .. } => ErrorKind::UnsupportedEcosystem,
        }
    }

    /// Only transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// The coordinate string the failed resolution was asked for
    pub fn coordinate(&self) -> &str {
        match self {
            ResolveError::NotFound { coordinate }
            | ResolveError::Transport { coordinate, .. }
            | ResolveError::Parse { coordinate, .. }
            | ResolveError::UnsupportedEcosystem { coordinate, .. } => coordinate,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported archive format")]
    UnsupportedFormat,

    #[error("Unsafe path in archive: {0}")]
    UnsafePath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("No artifact location for {0}")]
    NoArtifact(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to fetch {coordinate}: {source}")]
    Fetch {
        coordinate: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to extract {coordinate}: {source}")]
    Extract {
        coordinate: String,
        #[source]
        source: ExtractError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
