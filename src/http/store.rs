//! SQLite persistence for fetched documents
//!
//! Opt-in second tier behind the in-memory cache: lets repeated runs reuse
//! registry documents until they are older than the configured max age.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::http::cache::CachedDocument;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: index for age-based purging
    &["CREATE INDEX IF NOT EXISTS idx_documents_fetched_at ON documents(fetched_at)"],
];

pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing document store at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        debug!("Document store initialized");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                url TEXT PRIMARY KEY,
                body BLOB NOT NULL,
                fetched_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }

    /// Load a document fetched less than `max_age_ms` ago
    pub fn load(&self, url: &str, max_age_ms: i64) -> Result<Option<CachedDocument>, CacheError> {
        let threshold = Utc::now().timestamp_millis() - max_age_ms;
        let conn = self.lock_conn()?;

        let row = conn
            .query_row(
                "SELECT body, fetched_at FROM documents WHERE url = ?1 AND fetched_at >= ?2",
                (url, threshold),
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(body, fetched_at)| CachedDocument {
            url: url.to_string(),
            body,
            fetched_at: DateTime::from_timestamp_millis(fetched_at).unwrap_or_default(),
        }))
    }

    /// Insert or overwrite a document
    pub fn save(&self, document: &CachedDocument) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (url, body, fetched_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(url) DO UPDATE SET body = excluded.body, fetched_at = excluded.fetched_at
            "#,
            (
                &document.url,
                &document.body,
                document.fetched_at.timestamp_millis(),
            ),
        )?;
        Ok(())
    }

    /// Delete documents older than `max_age_ms`, returning how many were removed
    pub fn purge_older_than(&self, max_age_ms: i64) -> Result<usize, CacheError> {
        let threshold = Utc::now().timestamp_millis() - max_age_ms;
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM documents WHERE fetched_at < ?1", [threshold])?;
        debug!("Purged {} stale documents", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn document(url: &str, body: &str, fetched_at: DateTime<Utc>) -> CachedDocument {
        CachedDocument {
            url: url.to_string(),
            body: body.as_bytes().to_vec(),
            fetched_at,
        }
    }

    fn open_store(temp_dir: &TempDir) -> DocumentStore {
        DocumentStore::new(&temp_dir.path().join("nested").join("documents.db")).unwrap()
    }

    #[test]
    fn save_then_load_returns_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .save(&document("https://registry.npmjs.org/lodash", "{}", Utc::now()))
            .unwrap();

        let loaded = store
            .load("https://registry.npmjs.org/lodash", 60_000)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.body, b"{}");
    }

    #[test]
    fn load_skips_stale_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        let old = Utc::now() - Duration::hours(2);

        store.save(&document("https://pypi.org/pypi/requests/json", "{}", old)).unwrap();

        assert!(store.load("https://pypi.org/pypi/requests/json", 60_000).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_existing_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        let url = "https://registry.npmjs.org/axios";

        store.save(&document(url, "old", Utc::now())).unwrap();
        store.save(&document(url, "new", Utc::now())).unwrap();

        assert_eq!(store.load(url, 60_000).unwrap().unwrap().body, b"new");
    }

    #[test]
    fn purge_removes_only_stale_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.save(&document("fresh", "1", Utc::now())).unwrap();
        store
            .save(&document("stale", "2", Utc::now() - Duration::days(3)))
            .unwrap();

        assert_eq!(store.purge_older_than(86_400_000).unwrap(), 1);
        assert!(store.load("fresh", 86_400_000).unwrap().is_some());
    }

    #[test]
    fn reopening_existing_database_keeps_documents() {
        let temp_dir = TempDir::new().unwrap();
        let url = "https://hackage.haskell.org/package/aeson/preferred";
        open_store(&temp_dir).save(&document(url, "{}", Utc::now())).unwrap();

        let reopened = open_store(&temp_dir);

        assert!(reopened.load(url, 60_000).unwrap().is_some());
    }
}
