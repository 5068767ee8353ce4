//! Render cache key derivation.
//!
//! Keys combine the render variant, the input length in characters, and a fast
//! non-cryptographic hash of the input. The variant is the mode name, suffixed
//! for each stage switch or handling option that differs from the default, so
//! a default full render keys as `full:<len>:<hash>`. Two different inputs of
//! the same variant and length can collide; that risk is accepted.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::application::render::{ErrorHandling, RenderConfig};

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Cache key for rendering `content` under `config`.
pub fn cache_key(config: &RenderConfig, content: &str) -> String {
    let length = content.chars().count();
    format!("{}:{length}:{:016x}", variant(config), hash_value(content))
}

fn variant(config: &RenderConfig) -> String {
    let mut variant = config.mode.as_str().to_owned();
    if !config.features.markdown {
        variant.push_str("+nomarkdown");
    }
    if !config.features.question_syntax {
        variant.push_str("+noquestions");
    }
    if config.error_handling == ErrorHandling::Strict {
        variant.push_str("+strict");
    }
    variant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::RenderMode;

    fn full() -> RenderConfig {
        RenderConfig::default()
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(cache_key(&full(), "$x^2$"), cache_key(&full(), "$x^2$"));
    }

    #[test]
    fn key_embeds_mode_and_char_length() {
        let key = cache_key(&RenderConfig::with_mode(RenderMode::Preview), "héllo");
        assert!(key.starts_with("preview:5:"), "unexpected key {key}");
        assert_eq!(key.len(), "preview:5:".len() + 16);
    }

    #[test]
    fn mode_changes_key() {
        assert_ne!(
            cache_key(&full(), "same"),
            cache_key(&RenderConfig::with_mode(RenderMode::Lightweight), "same")
        );
    }

    #[test]
    fn content_changes_key() {
        assert_ne!(cache_key(&full(), "abcd"), cache_key(&full(), "abce"));
    }

    #[test]
    fn switches_are_folded_into_the_variant() {
        let mut config = full();
        config.features.markdown = false;
        config.features.question_syntax = false;
        config.error_handling = ErrorHandling::Strict;

        let key = cache_key(&config, "**bold**");
        assert!(
            key.starts_with("full+nomarkdown+noquestions+strict:8:"),
            "unexpected key {key}"
        );
        assert_ne!(key, cache_key(&full(), "**bold**"));
    }

    #[test]
    fn cache_settings_do_not_change_the_key() {
        let mut config = full();
        config.cache.max_entries = 3;
        config.features.auto_numbering = false;
        assert_eq!(cache_key(&config, "x"), cache_key(&full(), "x"));
    }
}
