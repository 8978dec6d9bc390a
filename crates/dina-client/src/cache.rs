//! Short-lived response cache for option-loading selects.
//!
//! Dropdowns that load their options from the API tend to issue the same
//! request several times in quick succession. Responses are kept for a short
//! time keyed by path and parameters. The cache knows nothing about list
//! tables; a table decides on its own when to fetch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::jsonapi::ListResponse;
use crate::params::GetParams;

/// Default time an entry stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(1);

/// Default maximum number of entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

type CacheKey = (String, GetParams);

struct CacheEntry {
    stored_at: Instant,
    response: Arc<ListResponse>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// In-memory cache of GET responses.
pub struct OptionCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl OptionCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Get a fresh cached response.
    pub fn get(&self, path: &str, params: &GetParams) -> Option<Arc<ListResponse>> {
        let key = (path.to_string(), params.clone());
        let entry = self.entries.get(&key)?;
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        debug!(path, "option cache hit");
        Some(Arc::clone(&entry.response))
    }

    /// Store a response.
    pub fn insert(
        &self,
        path: &str,
        params: &GetParams,
        response: ListResponse,
    ) -> Arc<ListResponse> {
        if self.entries.len() >= self.max_entries {
            self.cleanup_expired();
        }
        if self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let response = Arc::new(response);
        self.entries.insert(
            (path.to_string(), params.clone()),
            CacheEntry {
                stored_at: Instant::now(),
                response: Arc::clone(&response),
            },
        );
        response
    }

    /// Return the cached response, or GET it through `client` and cache it.
    pub async fn get_or_fetch(
        &self,
        client: &ApiClient,
        path: &str,
        params: &GetParams,
    ) -> Result<Arc<ListResponse>, Error> {
        if let Some(hit) = self.get(path, params) {
            return Ok(hit);
        }
        let response = client.get(path, params).await?;
        Ok(self.insert(path, params, response))
    }

    /// Drop expired entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().stored_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for OptionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for OptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonapi::Resource;

    fn response(kind: &str) -> ListResponse {
        ListResponse {
            data: vec![Resource::new(kind).with_id("1")],
            meta: None,
            included: Vec::new(),
        }
    }

    #[test]
    fn test_hit_requires_same_params() {
        let cache = OptionCache::default();
        let params = GetParams::new().with_filter("name", "x");
        cache.insert("person", &params, response("person"));

        assert!(cache.get("person", &params).is_some());
        assert!(cache.get("person", &GetParams::new()).is_none());
        assert!(cache.get("organization", &params).is_none());
    }

    #[test]
    fn test_entries_expire() {
        let cache = OptionCache::new(Duration::ZERO, 10);
        let params = GetParams::new();
        cache.insert("person", &params, response("person"));
        std::thread::sleep(Duration::from_millis(2));

        assert!(cache.get("person", &params).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_counts_removed_entries() {
        let cache = OptionCache::new(Duration::ZERO, 10);
        let params = GetParams::new();
        assert_eq!(cache.cleanup_expired(), 0);

        cache.insert("a", &params, response("a"));
        cache.insert("b", &params, response("b"));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.cleanup_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_while_other_threads_insert() {
        let cache = OptionCache::new(Duration::ZERO, 1_000);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200 {
                        let path = format!("list-{t}-{i}");
                        cache.insert(&path, &GetParams::new(), response(&path));
                    }
                });
            }
            for _ in 0..200 {
                cache.cleanup_expired();
            }
        });
        std::thread::sleep(Duration::from_millis(2));
        cache.cleanup_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_is_evicted_when_full() {
        let cache = OptionCache::new(Duration::from_secs(60), 2);
        let params = GetParams::new();
        cache.insert("a", &params, response("a"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", &params, response("b"));
        cache.insert("c", &params, response("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", &params).is_none());
        assert!(cache.get("c", &params).is_some());
    }
}
