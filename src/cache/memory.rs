//! In-memory TTL cache with optional write-through persistence
//!
//! Entries are never returned at or past their expiry. Expired entries are
//! dropped lazily on lookup and by a best-effort background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::storage::CacheStore;

/// A cached value and the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    #[serde(rename = "expiresAt", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

struct Inner<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    store: Option<Box<dyn CacheStore<V>>>,
}

/// Key-value cache with per-entry TTL.
///
/// Cloning is cheap and clones share the same entries.
pub struct TtlCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Create an empty in-memory cache
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                store: None,
            }),
        }
    }

    /// Create a cache backed by `store`, rehydrating whatever is still valid.
    ///
    /// A store that cannot be read yields an empty cache; the store is still
    /// used for subsequent writes.
    pub fn with_store<S>(store: S) -> Self
    where
        S: CacheStore<V> + 'static,
    {
        let now = Utc::now();
        let entries: HashMap<String, CacheEntry<V>> = match store.load() {
            Ok(loaded) => {
                let total = loaded.len();
                let live: HashMap<_, _> = loaded
                    .into_iter()
                    .filter(|(_, entry)| !entry.is_expired_at(now))
                    .collect();
                log::debug!(
                    "Rehydrated {} cache entries ({} expired skipped)",
                    live.len(),
                    total - live.len()
                );
                live
            }
            Err(e) => {
                log::warn!("Failed to load persisted cache: {}", e);
                HashMap::new()
            }
        };

        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(entries),
                store: Some(Box::new(store)),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic elsewhere never makes the map inconsistent, so keep using it
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry<V>>) {
        let Some(store) = self.inner.store.as_ref() else {
            return;
        };

        let now = Utc::now();
        let live: Vec<(&str, &CacheEntry<V>)> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(k, entry)| (k.as_str(), entry))
            .collect();

        if let Err(e) = store.save(&live) {
            log::warn!("Failed to persist cache ({} entries): {}", live.len(), e);
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.set_until(key, value, expires_at);
    }

    /// Store `value` under `key` until an absolute instant
    pub fn set_until(&self, key: impl Into<String>, value: V, expires_at: DateTime<Utc>) {
        let mut entries = self.entries();
        entries.insert(key.into(), CacheEntry { value, expires_at });
        self.persist(&entries);
    }

    /// Get a live value, evicting the entry if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let now = Utc::now();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                self.persist(&entries);
                None
            }
            None => None,
        }
    }

    /// Remove a single key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries();
        let removed = entries.remove(key).is_some();
        if removed {
            self.persist(&entries);
        }
        removed
    }

    /// Remove every key matching `pattern`. Returns the number removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Invalidated {} cache entries matching {}", removed, pattern);
            self.persist(&entries);
        }
        removed
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.clear();
        self.persist(&entries);
    }

    /// Remove all expired entries. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries);
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Run [`TtlCache::sweep`] every `every` on the tokio runtime.
    ///
    /// The task stops when the handle is dropped or the cache goes away.
    pub fn spawn_sweeper(&self, every: Duration) -> SweeperHandle {
        let weak = Arc::downgrade(&self.inner);
        let every = every.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let removed = TtlCache { inner }.sweep();
                if removed > 0 {
                    log::debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        });

        SweeperHandle { handle }
    }
}

/// Owns the background sweep task; aborts it on drop
#[derive(Debug)]
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
