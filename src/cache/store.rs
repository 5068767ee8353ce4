//! Render cache storage.
//!
//! A capacity-bounded map from cache key to compiled HTML and the diagnostics
//! the render produced alongside it. Entries expire
//! lazily: an entry older than the TTL is only removed when it is next looked
//! up. At capacity, the entry with the oldest `created_at` is evicted, found by
//! a full scan of the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use metrics::{counter, gauge};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use super::config::CacheConfig;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "examark_render_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "examark_render_cache_miss_total";
pub(crate) const METRIC_CACHE_SET: &str = "examark_render_cache_set_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "examark_render_cache_evict_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "examark_render_cache_expired_total";
pub(crate) const METRIC_CACHE_ENTRIES: &str = "examark_render_cache_entries";

/// Source of "now" for entry timestamps.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// Compiled HTML plus the error summary and warnings reported with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedRender {
    pub html: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl From<String> for CachedRender {
    fn from(html: String) -> Self {
        Self {
            html,
            ..Self::default()
        }
    }
}

impl From<&str> for CachedRender {
    fn from(html: &str) -> Self {
        Self::from(html.to_owned())
    }
}

/// A stored render. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub html: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: OffsetDateTime,
    /// Key length plus HTML length. Reported in stats, never used for eviction.
    pub approximate_size: usize,
    // Insertion order; breaks ties between identical timestamps.
    sequence: u64,
}

impl CacheEntry {
    fn new(key: String, render: CachedRender, created_at: OffsetDateTime, sequence: u64) -> Self {
        let approximate_size = key.len() + render.html.len();
        Self {
            key,
            html: render.html,
            error: render.error,
            warnings: render.warnings,
            created_at,
            approximate_size,
            sequence,
        }
    }
}

/// Point-in-time counters for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub entries: usize,
    pub approximate_bytes: usize,
    /// `hits / (hits + misses)`, or 0 when nothing has been looked up.
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    next_sequence: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, CacheEntry>,
    counters: Counters,
}

/// Process-wide render cache shared between render calls.
///
/// Every `get`/`set` runs under one mutex, so concurrent callers see each
/// operation atomically.
pub struct RenderCache {
    config: CacheConfig,
    state: Mutex<State>,
    clock: Clock,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl RenderCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(OffsetDateTime::now_utc))
    }

    /// Create a cache that reads the current time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Clock) -> Self {
        Self {
            config: config.clone(),
            state: Mutex::new(State::default()),
            clock,
        }
    }

    /// Look up the HTML stored under `key`. Missing and expired entries count
    /// as misses; an expired entry is removed by this call.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).map(|render| render.html)
    }

    /// Like [`RenderCache::get`], returning the stored diagnostics as well.
    pub fn lookup(&self, key: &str) -> Option<CachedRender> {
        let now = (self.clock)();
        let ttl = self.config.ttl();
        let mut guard = mutex_lock(&self.state, SOURCE, "get");
        let state = &mut *guard;

        let expired = state
            .entries
            .get(key)
            .map(|entry| now - entry.created_at > ttl);

        match expired {
            None => {
                state.counters.misses += 1;
                counter!(METRIC_CACHE_MISS).increment(1);
                None
            }
            Some(true) => {
                state.entries.remove(key);
                state.counters.misses += 1;
                counter!(METRIC_CACHE_MISS).increment(1);
                counter!(METRIC_CACHE_EXPIRED).increment(1);
                gauge!(METRIC_CACHE_ENTRIES).set(state.entries.len() as f64);
                debug!(target: "examark::cache", key, "expired render cache entry dropped");
                None
            }
            Some(false) => {
                state.counters.hits += 1;
                counter!(METRIC_CACHE_HIT).increment(1);
                state.entries.get(key).map(|entry| CachedRender {
                    html: entry.html.clone(),
                    error: entry.error.clone(),
                    warnings: entry.warnings.clone(),
                })
            }
        }
    }

    /// Store a render under `key` using the configured capacity.
    pub fn set(&self, key: impl Into<String>, render: impl Into<CachedRender>) {
        self.set_bounded(key, render, self.config.max_entries);
    }

    /// Store a render under `key`, evicting oldest entries until fewer than
    /// `max_entries` remain. A capacity of zero is treated as one. Replacing an
    /// existing key never evicts.
    pub fn set_bounded(
        &self,
        key: impl Into<String>,
        render: impl Into<CachedRender>,
        max_entries: usize,
    ) {
        let key = key.into();
        let render = render.into();
        let capacity = max_entries.max(1);
        let now = (self.clock)();

        let mut guard = mutex_lock(&self.state, SOURCE, "set");
        let state = &mut *guard;

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= capacity {
                let Some(oldest) = state
                    .entries
                    .values()
                    .min_by_key(|entry| (entry.created_at, entry.sequence))
                    .map(|entry| entry.key.clone())
                else {
                    break;
                };
                state.entries.remove(&oldest);
                state.counters.evictions += 1;
                counter!(METRIC_CACHE_EVICT).increment(1);
                debug!(
                    target: "examark::cache",
                    evicted = %oldest,
                    capacity,
                    "render cache at capacity, evicted oldest entry"
                );
            }
        }

        let sequence = state.counters.next_sequence;
        state.counters.next_sequence += 1;
        state
            .entries
            .insert(key.clone(), CacheEntry::new(key, render, now, sequence));
        state.counters.sets += 1;
        counter!(METRIC_CACHE_SET).increment(1);
        gauge!(METRIC_CACHE_ENTRIES).set(state.entries.len() as f64);
    }

    /// Inspect an entry without touching counters or expiry.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        mutex_lock(&self.state, SOURCE, "peek")
            .entries
            .get(key)
            .cloned()
    }

    /// Keys currently stored, including expired entries not yet looked up.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = mutex_lock(&self.state, SOURCE, "keys")
            .entries
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        mutex_lock(&self.state, SOURCE, "clear").entries.clear();
        gauge!(METRIC_CACHE_ENTRIES).set(0.0);
    }

    pub fn reset_stats(&self) {
        let mut guard = mutex_lock(&self.state, SOURCE, "reset_stats");
        let counters = &mut guard.counters;
        counters.hits = 0;
        counters.misses = 0;
        counters.sets = 0;
        counters.evictions = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let guard = mutex_lock(&self.state, SOURCE, "stats");
        let counters = &guard.counters;
        let lookups = counters.hits + counters.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            counters.hits as f64 / lookups as f64
        };

        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            evictions: counters.evictions,
            entries: guard.entries.len(),
            approximate_bytes: guard
                .entries
                .values()
                .map(|entry| entry.approximate_size)
                .sum(),
            hit_rate,
        }
    }
}
