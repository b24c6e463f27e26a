//! Durable backends for the response cache
//!
//! Two formats are supported: a single JSON object of
//! `{key: {"value": .., "expiresAt": <epoch ms>}}` (the `app_cache` blob),
//! and a SQLite table for larger caches.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::DateTime;
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::memory::CacheEntry;
use crate::error::CacheError;

/// Schema version - increment to trigger drop-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, CacheError>;

/// Durable storage behind a [`TtlCache`](super::TtlCache).
///
/// `save` receives the full set of live entries and replaces whatever was
/// stored before.
pub trait CacheStore<V>: Send + Sync {
    fn load(&self) -> Result<Vec<(String, CacheEntry<V>)>>;

    fn save(&self, entries: &[(&str, &CacheEntry<V>)]) -> Result<()>;
}

/// Single-file JSON store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location (`~/.cache/glpidesk/app_cache.json` on Linux)
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::cache_dir()
            .ok_or_else(|| CacheError::Io("Could not determine cache directory".to_string()))?;
        Ok(base.join("glpidesk").join("app_cache.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V> CacheStore<V> for JsonFileStore
where
    V: Serialize + DeserializeOwned + Send,
{
    fn load(&self) -> Result<Vec<(String, CacheEntry<V>)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = std::fs::read(&self.path)
            .map_err(|e| CacheError::Io(format!("Failed to read {}: {}", self.path.display(), e)))?;
        let map: HashMap<String, CacheEntry<V>> = serde_json::from_slice(&contents)?;

        Ok(map.into_iter().collect())
    }

    fn save(&self, entries: &[(&str, &CacheEntry<V>)]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;
        }

        let map: BTreeMap<&str, &CacheEntry<V>> = entries.iter().copied().collect();
        let data = serde_json::to_vec(&map)?;

        // Write-then-rename so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)
            .map_err(|e| CacheError::Io(format!("Failed to write cache: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| CacheError::Io(format!("Failed to replace cache: {}", e)))?;

        Ok(())
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch("DROP TABLE IF EXISTS cache_entries;")?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON cache_entries(expires_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Io("Cache database lock poisoned".to_string()))
    }
}

impl<V> CacheStore<V> for SqliteStore
where
    V: Serialize + DeserializeOwned + Send,
{
    fn load(&self) -> Result<Vec<(String, CacheEntry<V>)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT cache_key, data, expires_at FROM cache_entries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, data, expires_ms) = row?;
            let Some(expires_at) = DateTime::from_timestamp_millis(expires_ms) else {
                log::warn!("Skipping cache entry {} with invalid expiry", key);
                continue;
            };
            match serde_json::from_str::<V>(&data) {
                Ok(value) => entries.push((key, CacheEntry { value, expires_at })),
                Err(e) => log::warn!("Skipping unreadable cache entry {}: {}", key, e),
            }
        }

        Ok(entries)
    }

    fn save(&self, entries: &[(&str, &CacheEntry<V>)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM cache_entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cache_entries (cache_key, data, expires_at) VALUES (?1, ?2, ?3)",
            )?;
            for (key, entry) in entries {
                let data = serde_json::to_string(&entry.value)?;
                stmt.execute(params![key, data, entry.expires_at.timestamp_millis()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
