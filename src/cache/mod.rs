//! Response cache for GLPI reads
//!
//! An in-memory TTL map with regex invalidation, optionally written through
//! to a JSON blob or a SQLite file so warm entries survive restarts.

pub mod key;
pub mod memory;
pub mod storage;

use std::time::Duration;

use crate::config::{CacheSettings, Persistence};

/// Cache TTL per resource family
///
/// Reads without an explicit TTL use the configured default (300s).
pub struct CacheTtl;

impl CacheTtl {
    // Tickets move through the workflow quickly
    pub const TICKETS: Duration = Duration::from_secs(60); // 1 min
    pub const FOLLOWUPS: Duration = Duration::from_secs(60); // 1 min
    pub const DOCUMENTS: Duration = Duration::from_secs(2 * 60); // 2 min

    // Directory data is fairly stable
    pub const USERS: Duration = Duration::from_secs(10 * 60); // 10 min
    pub const GROUPS: Duration = Duration::from_secs(10 * 60); // 10 min
    pub const CATEGORIES: Duration = Duration::from_secs(5 * 60); // 5 min
}

// Re-export main types
pub use key::{cache_key, scoped_key};
pub use memory::{CacheEntry, SweeperHandle, TtlCache};
pub use storage::{CacheStore, JsonFileStore, SqliteStore};

/// Build the response cache described by `settings`.
///
/// A store that cannot be opened degrades to an in-memory cache.
pub fn build_response_cache(settings: &CacheSettings) -> TtlCache<serde_json::Value> {
    match &settings.persistence {
        Persistence::None => TtlCache::new(),
        Persistence::Json { path } => TtlCache::with_store(JsonFileStore::new(path)),
        Persistence::Sqlite { path } => match SqliteStore::open_at(path) {
            Ok(store) => TtlCache::with_store(store),
            Err(e) => {
                log::warn!(
                    "Failed to open cache database {}: {}; using memory only",
                    path.display(),
                    e
                );
                TtlCache::new()
            }
        },
    }
}
