//! Process-lifetime HTTP document cache
//!
//! Documents are keyed by their exact URL (query string included). The
//! first request for a URL goes to the network, later requests are served
//! from memory. Failed requests are never stored, and an entry only becomes
//! visible after its whole body has been read.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::config::{CacheConfig, FETCH_TIMEOUT_MS, USER_AGENT, db_path};
use crate::error::{CacheError, FetchError};
use crate::http::store::DocumentStore;

/// A fetched response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub url: String,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedDocument {
    pub fn json(&self) -> Result<serde_json::Value, FetchError> {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct HttpCache {
    client: reqwest::Client,
    documents: DashMap<String, Arc<CachedDocument>>,
    store: Option<DocumentStore>,
    max_age_ms: i64,
}

impl Default for HttpCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCache {
    /// Memory-only cache with the default HTTP client
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS as u64))
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            documents: DashMap::new(),
            store: None,
            max_age_ms: 0,
        }
    }

    /// Back the memory cache with a persistent store
    pub fn with_store(mut self, store: DocumentStore, max_age_ms: i64) -> Self {
        self.store = Some(store);
        self.max_age_ms = max_age_ms;
        self
    }

    /// Build the cache described by `config`. A persistent store drops
    /// documents older than `max_age_ms` when opened.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let cache = Self::new();
        if !config.persist {
            return Ok(cache);
        }
        let path = config.path.clone().unwrap_or_else(db_path);
        let store = DocumentStore::new(&path)?;
        store.purge_older_than(config.max_age_ms)?;
        Ok(cache.with_store(store, config.max_age_ms))
    }

    /// Fetch `url`, serving it from the cache when `use_cache` is set.
    /// With `use_cache` unset the document is always fetched and the cached
    /// entry overwritten.
    pub async fn get(&self, url: &str, use_cache: bool) -> Result<Arc<CachedDocument>, FetchError> {
        self.get_as(url, None, use_cache).await
    }

    /// Fetch `url` and parse its body as JSON
    pub async fn get_json(
        &self,
        url: &str,
        use_cache: bool,
    ) -> Result<serde_json::Value, FetchError> {
        self.get_as(url, Some("application/json"), use_cache)
            .await?
            .json()
    }

    /// Fetch `url` as text (lossy UTF-8)
    pub async fn get_text(&self, url: &str, use_cache: bool) -> Result<String, FetchError> {
        Ok(self.get(url, use_cache).await?.text())
    }

    /// Whether `url` is cached or answers a HEAD request successfully
    pub async fn exists(&self, url: &str) -> bool {
        if self.documents.contains_key(url) {
            return true;
        }
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    /// Fetch an artifact without caching its body
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(self.fetch(url, None).await?.body)
    }

    /// Number of documents held in memory
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    async fn get_as(
        &self,
        url: &str,
        accept: Option<&str>,
        use_cache: bool,
    ) -> Result<Arc<CachedDocument>, FetchError> {
        if use_cache {
            let hit = self.documents.get(url).map(|entry| Arc::clone(entry.value()));
            if let Some(document) = hit {
                debug!("Cache hit: {}", url);
                return Ok(document);
            }
            if let Some(document) = self.load_stored(url) {
                debug!("Loaded {} from document store", url);
                let document = Arc::new(document);
                self.documents.insert(url.to_string(), Arc::clone(&document));
                return Ok(document);
            }
        }

        let document = Arc::new(self.fetch(url, accept).await?);
        self.documents.insert(url.to_string(), Arc::clone(&document));
        self.persist(&document);
        Ok(document)
    }

    async fn fetch(&self, url: &str, accept: Option<&str>) -> Result<CachedDocument, FetchError> {
        debug!("Fetching {}", url);

        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::NOT_FOUND {
                debug!("Not found: {}", url);
            } else {
                warn!("Registry returned status {}: {}", status, url);
            }
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        Ok(CachedDocument {
            url: url.to_string(),
            body: body.to_vec(),
            fetched_at: Utc::now(),
        })
    }

    fn load_stored(&self, url: &str) -> Option<CachedDocument> {
        let store = self.store.as_ref()?;
        store
            .load(url, self.max_age_ms)
            .inspect_err(|e| warn!("Failed to read document store: {}", e))
            .ok()
            .flatten()
    }

    fn persist(&self, document: &CachedDocument) {
        if let Some(store) = &self.store
            && let Err(e) = store.save(document)
        {
            warn!("Failed to persist {}: {}", document.url, e);
        }
    }
}
