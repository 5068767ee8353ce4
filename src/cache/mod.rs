//! Render cache.
//!
//! Maps `(mode, features, content)` keys to compiled HTML so repeated renders of the same
//! question skip the pipeline. Bounded by entry count and expired by age.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! max_entries = 100
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::{CACHE_TTL, CacheConfig, DEFAULT_MAX_ENTRIES};
pub use keys::{cache_key, hash_value};
pub use store::{CacheEntry, CacheStats, CachedRender, Clock, RenderCache};
