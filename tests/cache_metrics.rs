use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use examark::cache::{CacheConfig, Clock, RenderCache};
use examark::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;
use time::{Duration, OffsetDateTime, macros::datetime};

#[test]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let now = Arc::new(Mutex::new(datetime!(2024-05-01 12:00 UTC)));
    let handle = Arc::clone(&now);
    let clock: Clock = Arc::new(move || -> OffsetDateTime { *handle.lock().expect("clock lock") });

    let config = CacheConfig {
        max_entries: 1,
        ..Default::default()
    };
    let cache = RenderCache::with_clock(&config, clock);

    // miss, set, hit
    assert!(cache.get("full:1:a").is_none());
    cache.set("full:1:a", "<p>a</p>");
    assert!(cache.get("full:1:a").is_some());

    // capacity eviction
    cache.set("full:1:b", "<p>b</p>");

    // expiry
    *now.lock().expect("clock lock") += Duration::days(2);
    assert!(cache.get("full:1:b").is_none());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "examark_render_cache_hit_total",
        "examark_render_cache_miss_total",
        "examark_render_cache_set_total",
        "examark_render_cache_evict_total",
        "examark_render_cache_expired_total",
        "examark_render_cache_entries",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.entries, 0);
}
