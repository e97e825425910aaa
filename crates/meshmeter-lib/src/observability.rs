//! Observability infrastructure for the measurement pipeline
//!
//! Prometheus metrics covering the parts that degrade silently otherwise:
//! network fetch retries/failures, pods dropped per reason, snapshot
//! assembly latency, and completed windows.

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Histogram buckets for snapshot assembly latency (seconds). Assembly spans
/// one HTTP round-trip per node plus the bounded-parallel exec pass.
const ASSEMBLY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MeterMetricsInner> = OnceLock::new();

struct MeterMetricsInner {
    net_fetch_retries: IntCounter,
    net_fetch_failures: IntCounter,
    pods_dropped: IntCounterVec,
    windows_completed: IntCounter,
    snapshot_assembly_seconds: Histogram,
}

impl MeterMetricsInner {
    fn new() -> Self {
        Self {
            net_fetch_retries: register_int_counter!(
                "meshmeter_net_fetch_retries_total",
                "Per-pod network counter read attempts that failed and were retried or abandoned"
            )
            .expect("Failed to register net_fetch_retries_total"),

            net_fetch_failures: register_int_counter!(
                "meshmeter_net_fetch_failures_total",
                "Pods whose network read exhausted its retry budget and was zeroed"
            )
            .expect("Failed to register net_fetch_failures_total"),

            pods_dropped: register_int_counter_vec!(
                "meshmeter_pods_dropped_total",
                "Pods excluded from a window's delta records, by reason",
                &["reason"]
            )
            .expect("Failed to register pods_dropped_total"),

            windows_completed: register_int_counter!(
                "meshmeter_windows_completed_total",
                "Measurement windows that produced a delta report"
            )
            .expect("Failed to register windows_completed_total"),

            snapshot_assembly_seconds: register_histogram!(
                "meshmeter_snapshot_assembly_seconds",
                "Time spent assembling one snapshot across all metric sources",
                ASSEMBLY_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_assembly_seconds"),
        }
    }
}

/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct MeterMetrics {
    _private: (),
}

impl Default for MeterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MeterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MeterMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_net_fetch_retries(&self) {
        self.inner().net_fetch_retries.inc();
    }

    pub fn inc_net_fetch_failures(&self) {
        self.inner().net_fetch_failures.inc();
    }

    pub fn inc_pods_dropped(&self, reason: &str) {
        self.inner().pods_dropped.with_label_values(&[reason]).inc();
    }

    pub fn inc_windows_completed(&self) {
        self.inner().windows_completed.inc();
    }

    pub fn observe_snapshot_assembly(&self, duration_secs: f64) {
        self.inner().snapshot_assembly_seconds.observe(duration_secs);
    }
}
