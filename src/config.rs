use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default maximum age of persisted documents in milliseconds (24 hours)
pub const DEFAULT_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: i64 = 30_000;

/// User agent sent with every registry request
pub const USER_AGENT: &str = concat!("purl-meta/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Default registry endpoints
// =============================================================================

pub const DEFAULT_NPM_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_NUGET_URL: &str = "https://api.nuget.org";
pub const DEFAULT_HACKAGE_URL: &str = "https://hackage.haskell.org";
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org";
pub const DEFAULT_PYPI_FILES_URL: &str = "https://files.pythonhosted.org";

/// Resolver configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub cache: CacheConfig,
    pub registries: RegistriesConfig,
}

impl ResolverConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Persist fetched documents to SQLite across runs
    pub persist: bool,
    /// Maximum age of a persisted document in milliseconds
    pub max_age_ms: i64,
    /// Database location, defaults to [`db_path`]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persist: false,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            path: None,
        }
    }
}

/// Registry-specific configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistriesConfig {
    pub npm: RegistryConfig,
    pub nuget: RegistryConfig,
    pub hackage: RegistryConfig,
    pub pypi: RegistryConfig,
}

impl Default for RegistriesConfig {
    fn default() -> Self {
        Self {
            npm: RegistryConfig::with_base_url(DEFAULT_NPM_URL),
            nuget: RegistryConfig::with_base_url(DEFAULT_NUGET_URL),
            hackage: RegistryConfig::with_base_url(DEFAULT_HACKAGE_URL),
            pypi: RegistryConfig {
                files_url: Some(DEFAULT_PYPI_FILES_URL.to_string()),
                ..RegistryConfig::with_base_url(DEFAULT_PYPI_URL)
            },
        }
    }
}

/// Individual registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Separate host for artifact files (PyPI)
    pub files_url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::with_base_url("")
    }
}

impl RegistryConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.to_string(),
            files_url: None,
        }
    }

    /// Configured base URL, or `default` when left empty
    pub fn base_url_or(&self, default: &str) -> String {
        if self.base_url.is_empty() {
            default.to_string()
        } else {
            self.base_url.trim_end_matches('/').to_string()
        }
    }
}

/// Returns the path to the data directory for purl-meta.
/// Uses $XDG_DATA_HOME/purl-meta if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/purl-meta,
/// or ./purl-meta if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the document database file.
pub fn db_path() -> PathBuf {
    data_dir().join("documents.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("purl-meta.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("purl-meta")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolver_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<ResolverConfig>(json!({
            "cache": {
                "persist": true
            }
        }))
        .unwrap();

        assert!(result.cache.persist);
        assert_eq!(result.cache.max_age_ms, DEFAULT_MAX_AGE_MS);
        assert_eq!(result.registries, RegistriesConfig::default());
    }

    #[test]
    fn resolver_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<ResolverConfig>(json!({
            "cache": {
                "persist": true,
                "maxAgeMs": 5000,
                "path": "/tmp/docs.db"
            },
            "registries": {
                "npm": { "enabled": false },
                "nuget": { "baseUrl": "http://localhost:8080" },
                "hackage": { "enabled": true, "baseUrl": "http://hackage.local/" },
                "pypi": { "baseUrl": "http://pypi.local", "filesUrl": "http://files.local" }
            }
        }))
        .unwrap();

        assert_eq!(
            result.cache,
            CacheConfig {
                persist: true,
                max_age_ms: 5000,
                path: Some(PathBuf::from("/tmp/docs.db")),
            }
        );
        assert!(!result.registries.npm.enabled);
        assert!(result.registries.nuget.enabled);
        assert_eq!(
            result.registries.nuget.base_url_or(DEFAULT_NUGET_URL),
            "http://localhost:8080"
        );
        assert_eq!(
            result.registries.hackage.base_url_or(DEFAULT_HACKAGE_URL),
            "http://hackage.local"
        );
        assert_eq!(
            result.registries.pypi.files_url.as_deref(),
            Some("http://files.local")
        );
    }

    #[test]
    fn registry_config_without_base_url_falls_back_to_default() {
        let result = serde_json::from_value::<RegistryConfig>(json!({ "enabled": true })).unwrap();

        assert_eq!(result.base_url_or(DEFAULT_NPM_URL), DEFAULT_NPM_URL);
    }

    #[test]
    fn load_reads_json_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"cache": {"maxAgeMs": 1}}"#).unwrap();

        let config = ResolverConfig::load(&path).unwrap();

        assert_eq!(config.cache.max_age_ms, 1);
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/purl-meta"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/purl-meta"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./purl-meta"));
    }
}
