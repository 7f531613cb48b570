// TTL cache for collaborator responses
// Injected into the HTTP clients; there is no process-wide instance

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// One hour, used when no TTL is given.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryStats {
    pub key: String,
    pub age: Duration,
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<CacheEntryStats>,
}

pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cloned value if present and not expired. Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.write().insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read();
        let mut listed: Vec<CacheEntryStats> = entries
            .iter()
            .map(|(key, entry)| CacheEntryStats {
                key: key.clone(),
                age: now.saturating_duration_since(entry.stored_at),
                ttl: entry.ttl,
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: entries.len(),
            entries: listed,
        }
    }

    /// Return the cached value for `key`, or run `fetch` and store a successful result.
    ///
    /// Errors are never cached. Two concurrent misses on the same key may both fetch;
    /// the later write wins and readers always see a whole value.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!("cache hit: {}", key);
            return Ok(hit);
        }

        tracing::debug!("cache miss: {}", key);
        let value = fetch().await?;
        self.set_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a cache key as `prefix:k1=v1&k2=v2` with parameters sorted by name.
pub fn generate_key(prefix: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}:{}", prefix, joined)
}
