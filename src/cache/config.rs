//! Render cache configuration.
//!
//! Built from the validated `cache` settings; the TTL is fixed at
//! [`CACHE_TTL`].

use time::Duration;

/// Capacity used when neither configuration nor the caller supplies one.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Age after which an entry is treated as absent.
pub const CACHE_TTL: Duration = Duration::hours(24);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub max_entries: usize,
    /// Entry lifetime in seconds.
    pub ttl_seconds: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_seconds: CACHE_TTL.whole_seconds(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries.get(),
            ttl_seconds: CACHE_TTL.whole_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds)
    }
}
