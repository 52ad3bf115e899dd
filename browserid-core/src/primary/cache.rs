//! Read-through cache of resolved primary support
//!
//! Outcomes are keyed by the domain that was asked about, not the domain
//! that finally answered after delegation. Without a TTL, entries live for
//! the lifetime of the process, so a primary that rotates its key is not
//! noticed until restart.

use std::time::Duration;

use moka::sync::Cache;

use super::Support;

/// Bounds for the support cache. The default is unbounded with no expiry.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub max_entries: Option<u64>,
    pub time_to_live: Option<Duration>,
}

#[derive(Clone)]
pub struct SupportCache {
    inner: Cache<String, Support>,
}

impl SupportCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder();
        if let Some(max) = config.max_entries {
            builder = builder.max_capacity(max);
        }
        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        Self {
            inner: builder.build(),
        }
    }

    pub fn get(&self, domain: &str) -> Option<Support> {
        self.inner.get(domain)
    }

    /// Store an outcome. Also used to pre-seed entries in dev and test setups.
    pub fn insert(&self, domain: impl Into<String>, support: Support) {
        self.inner.insert(domain.into(), support);
    }

    pub fn invalidate(&self, domain: &str) {
        self.inner.invalidate(domain);
    }
}

impl Default for SupportCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for SupportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
