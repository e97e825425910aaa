//! Delta-rate estimation between two snapshots
//!
//! Turns two time-separated snapshots of the same pod universe into per-pod
//! rates. Cumulative counters are differenced and divided by the measured
//! wall-clock gap between the snapshots, never by the nominal sleep duration,
//! so scheduling jitter and collection latency are accounted for.
//!
//! A negative counter delta means the underlying container restarted; the
//! whole pod is dropped for the interval rather than clamped, since clamping
//! would silently understate rates. Drops are recorded, logged, and counted,
//! never fatal to the window.

use crate::error::MeterError;
use crate::models::{DeltaRecord, DropReason, DroppedPod, PodSample, Snapshot, WindowReport};
use crate::observability::MeterMetrics;
use tracing::{info, warn};

const NANOS_PER_MILLICORE_SECOND: f64 = 1_000_000.0;
const BYTES_PER_KIB: f64 = 1024.0;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Compute per-pod rates between two snapshots of the same pod universe.
///
/// Fails only when a snapshot is empty (total collection failure upstream)
/// or the snapshots are not time-ordered; per-pod problems become audit
/// entries in the returned report. Deterministic: the same snapshot pair
/// always yields identical records, sorted by pod id.
pub fn compute(start: &Snapshot, end: &Snapshot) -> Result<WindowReport, MeterError> {
    if start.is_empty() {
        return Err(MeterError::EmptySnapshot {
            taken_at: start.taken_at.to_rfc3339(),
        });
    }
    if end.is_empty() {
        return Err(MeterError::EmptySnapshot {
            taken_at: end.taken_at.to_rfc3339(),
        });
    }

    let elapsed_seconds = (end.taken_at - start.taken_at).num_milliseconds() as f64 / 1000.0;
    if elapsed_seconds <= 0.0 {
        return Err(MeterError::NonPositiveElapsed { elapsed_seconds });
    }

    let metrics = MeterMetrics::new();
    let mut records = Vec::new();
    let mut drops = Vec::new();

    let mut ids: Vec<_> = start.pods.keys().collect();
    ids.sort();

    for id in ids {
        let t1 = &start.pods[id];

        let Some(t2) = end.pods.get(id) else {
            warn!(pod = %id, "Pod disappeared during measurement, dropping");
            metrics.inc_pods_dropped("disappeared");
            drops.push(DroppedPod {
                id: id.clone(),
                category: t1.category.clone(),
                service: t1.service.clone(),
                node: t1.node.clone(),
                reason: DropReason::Disappeared,
            });
            continue;
        };

        if let Some(counter) = first_regressed_counter(t1, t2) {
            warn!(pod = %id, counter, "Counter reset detected, dropping pod for this window");
            metrics.inc_pods_dropped("counter_reset");
            drops.push(DroppedPod {
                id: id.clone(),
                category: t1.category.clone(),
                service: t1.service.clone(),
                node: t1.node.clone(),
                reason: DropReason::CounterReset {
                    counter: counter.to_string(),
                },
            });
            continue;
        }

        let cpu_rate =
            |c1: u64, c2: u64| (c2 - c1) as f64 / elapsed_seconds / NANOS_PER_MILLICORE_SECOND;
        let net_rate = |c1: u64, c2: u64| (c2 - c1) as f64 / elapsed_seconds / BYTES_PER_KIB;

        records.push(DeltaRecord {
            id: id.clone(),
            category: t2.category.clone(),
            service: t2.service.clone(),
            node: t2.node.clone(),
            cpu_total_m: cpu_rate(t1.cpu_total_ns, t2.cpu_total_ns),
            cpu_app_m: cpu_rate(t1.cpu_app_ns, t2.cpu_app_ns),
            cpu_sidecar_m: cpu_rate(t1.cpu_sidecar_ns, t2.cpu_sidecar_ns),
            rx_kib_s: net_rate(t1.rx_bytes, t2.rx_bytes),
            tx_kib_s: net_rate(t1.tx_bytes, t2.tx_bytes),
            mem_working_set_mib: t2.mem_working_set_bytes as f64 / BYTES_PER_MIB,
            mem_rss_mib: t2.mem_rss_bytes as f64 / BYTES_PER_MIB,
            mem_delta_mib: (t2.mem_working_set_bytes as f64
                - t1.mem_working_set_bytes as f64)
                / BYTES_PER_MIB,
        });
    }

    let report = WindowReport {
        elapsed_seconds,
        records,
        drops,
    };

    info!(
        kept = report.kept(),
        dropped = report.dropped(),
        elapsed_seconds,
        "Delta computation complete"
    );
    for (reason, count) in report.drop_reasons() {
        info!(reason = %reason, count, "Window drop reason");
    }

    Ok(report)
}

/// The monotonic counters checked for regression, with their names as they
/// appear in drop reasons. Any single regression invalidates the whole pod
/// for the interval.
fn first_regressed_counter(t1: &PodSample, t2: &PodSample) -> Option<&'static str> {
    let counters = [
        ("cpu_total_ns", t1.cpu_total_ns, t2.cpu_total_ns),
        ("cpu_app_ns", t1.cpu_app_ns, t2.cpu_app_ns),
        ("cpu_sidecar_ns", t1.cpu_sidecar_ns, t2.cpu_sidecar_ns),
        ("rx_bytes", t1.rx_bytes, t2.rx_bytes),
        ("tx_bytes", t1.tx_bytes, t2.tx_bytes),
    ];

    counters
        .into_iter()
        .find(|(_, c1, c2)| c2 < c1)
        .map(|(name, _, _)| name)
}
