use std::sync::LazyLock;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use tracing::warn;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECORD_COUNT: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "ipcatd_record_count",
        "Total number of ranges in the catalog",
    )
    .unwrap()
});

static LAST_SYNC_TIMESTAMP: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "ipcatd_last_sync_timestamp",
        "Unix timestamp of last successful sync",
    )
    .unwrap()
});

static SYNC_SUCCESS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ipcatd_sync_success_total",
        "Total number of successful syncs",
    )
    .unwrap()
});

static SYNC_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("ipcatd_sync_failures_total", "Total number of failed syncs").unwrap()
});

static SYNC_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("ipcatd_sync_duration_seconds", "Sync duration in seconds")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
    )
    .unwrap()
});

static LOOKUP_REQUESTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ipcatd_lookup_requests_total",
        "Total number of lookup requests",
    )
    .unwrap()
});

static LOOKUP_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("ipcatd_lookup_hits_total", "Total number of lookup hits").unwrap()
});

static LOOKUP_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("ipcatd_lookup_latency_seconds", "Lookup latency in seconds").buckets(
            vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        ),
    )
    .unwrap()
});

static REST_REQUESTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ipcatd_rest_requests_total",
        "Total number of REST requests",
    )
    .unwrap()
});

fn register_metric<T: prometheus::core::Collector + Clone + 'static>(metric: &T, name: &str) {
    if let Err(e) = REGISTRY.register(Box::new(metric.clone())) {
        warn!("Failed to register metric {}: {}", name, e);
    }
}

pub fn register_metrics() {
    register_metric(&*RECORD_COUNT, "record_count");
    register_metric(&*LAST_SYNC_TIMESTAMP, "last_sync_timestamp");
    register_metric(&*SYNC_SUCCESS, "sync_success");
    register_metric(&*SYNC_FAILURES, "sync_failures");
    register_metric(&*SYNC_DURATION, "sync_duration");
    register_metric(&*LOOKUP_REQUESTS, "lookup_requests");
    register_metric(&*LOOKUP_HITS, "lookup_hits");
    register_metric(&*LOOKUP_LATENCY, "lookup_latency");
    register_metric(&*REST_REQUESTS, "rest_requests");
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

pub fn set_record_count(count: i64) {
    RECORD_COUNT.set(count);
}

pub fn set_last_sync_timestamp(ts: i64) {
    LAST_SYNC_TIMESTAMP.set(ts);
}

pub fn inc_sync_success() {
    SYNC_SUCCESS.inc();
}

pub fn inc_sync_failures() {
    SYNC_FAILURES.inc();
}

pub fn record_sync_duration(seconds: f64) {
    SYNC_DURATION.observe(seconds);
}

pub fn inc_lookup_requests() {
    LOOKUP_REQUESTS.inc();
}

pub fn inc_lookup_hits() {
    LOOKUP_HITS.inc();
}

pub fn record_lookup_latency(seconds: f64) {
    LOOKUP_LATENCY.observe(seconds);
}

pub fn inc_rest_requests() {
    REST_REQUESTS.inc();
}
