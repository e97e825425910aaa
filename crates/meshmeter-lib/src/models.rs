//! Core data models for the measurement pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier for a monitored pod: namespace + name.
///
/// Pods are ephemeral; identifiers are discovered fresh at every snapshot and
/// there is no persistent registry across measurement windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodId {
    pub namespace: String,
    pub name: String,
}

impl PodId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Raw network byte counters for one pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl NetCounters {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }

    /// Failure marker: a fetch that gave up yields zeroed counters rather
    /// than omitting the pod from the snapshot.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// One pod's complete set of readings at one snapshot time.
///
/// CPU and network values are cumulative counters (monotonic while the
/// underlying containers live); memory values are point-sample gauges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSample {
    pub category: String,
    pub service: String,
    pub node: String,
    /// Cumulative CPU nanoseconds across all containers.
    pub cpu_total_ns: u64,
    /// Cumulative CPU nanoseconds for non-sidecar containers.
    pub cpu_app_ns: u64,
    /// Cumulative CPU nanoseconds for the mesh sidecar container, if any.
    pub cpu_sidecar_ns: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub mem_working_set_bytes: u64,
    pub mem_rss_bytes: u64,
}

/// All pod readings captured at approximately one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Wall-clock time the snapshot finished assembling. Delta computation
    /// uses the gap between two of these, never the nominal sleep duration.
    pub taken_at: DateTime<Utc>,
    pub pods: HashMap<PodId, PodSample>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            pods: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

/// Why a pod was excluded from a window's delta records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DropReason {
    /// Present at T1 but absent at T2.
    Disappeared,
    /// A cumulative counter decreased across the interval, which signals a
    /// container restart invalidating the whole interval for the pod.
    CounterReset { counter: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Disappeared => write!(f, "pod disappeared during measurement"),
            DropReason::CounterReset { counter } => {
                write!(f, "counter reset detected ({counter})")
            }
        }
    }
}

/// Audit record for a pod excluded from a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedPod {
    pub id: PodId,
    pub category: String,
    pub service: String,
    pub node: String,
    pub reason: DropReason,
}

/// Per-pod rates computed between two snapshots.
///
/// CPU rates are millicores (nanosecond deltas normalized by elapsed wall
/// time), network rates are KiB/s, memory gauges are taken verbatim from the
/// later snapshot in MiB. Internal values keep full f64 precision; rounding
/// happens only at serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub id: PodId,
    pub category: String,
    pub service: String,
    pub node: String,
    pub cpu_total_m: f64,
    pub cpu_app_m: f64,
    pub cpu_sidecar_m: f64,
    pub rx_kib_s: f64,
    pub tx_kib_s: f64,
    pub mem_working_set_mib: f64,
    pub mem_rss_mib: f64,
    /// Signed working-set change across the interval, for drift diagnosis.
    pub mem_delta_mib: f64,
}

/// Aggregated totals for one pod category within a window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTotals {
    pub pods: usize,
    pub cpu_total_m: f64,
    pub mem_working_set_mib: f64,
    pub rx_kib_s: f64,
    pub tx_kib_s: f64,
}

/// Output of one measurement window: the kept delta records plus the audit
/// trail of dropped pods. This is the only data that outlives the window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub elapsed_seconds: f64,
    pub records: Vec<DeltaRecord>,
    pub drops: Vec<DroppedPod>,
}

impl WindowReport {
    pub fn kept(&self) -> usize {
        self.records.len()
    }

    pub fn dropped(&self) -> usize {
        self.drops.len()
    }

    /// Totals grouped by pod category, sorted by category name.
    pub fn summary_by_category(&self) -> Vec<(String, CategoryTotals)> {
        let mut by_category: HashMap<String, CategoryTotals> = HashMap::new();

        for record in &self.records {
            let totals = by_category.entry(record.category.clone()).or_default();
            totals.pods += 1;
            totals.cpu_total_m += record.cpu_total_m;
            totals.mem_working_set_mib += record.mem_working_set_mib;
            totals.rx_kib_s += record.rx_kib_s;
            totals.tx_kib_s += record.tx_kib_s;
        }

        let mut summary: Vec<_> = by_category.into_iter().collect();
        summary.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    /// Drop reasons with occurrence counts, most frequent first.
    pub fn drop_reasons(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for drop in &self.drops {
            *counts.entry(drop.reason.to_string()).or_default() += 1;
        }

        let mut reasons: Vec<_> = counts.into_iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, cpu: f64) -> DeltaRecord {
        DeltaRecord {
            id: PodId::new("default", "frontend-abc123-xy1"),
            category: category.to_string(),
            service: "frontend".to_string(),
            node: "node-0".to_string(),
            cpu_total_m: cpu,
            cpu_app_m: cpu,
            cpu_sidecar_m: 0.0,
            rx_kib_s: 1.0,
            tx_kib_s: 2.0,
            mem_working_set_mib: 64.0,
            mem_rss_mib: 60.0,
            mem_delta_mib: 0.5,
        }
    }

    #[test]
    fn pod_id_display() {
        let id = PodId::new("hotel-res", "frontend-5f6d8-abc12");
        assert_eq!(id.to_string(), "hotel-res/frontend-5f6d8-abc12");
    }

    #[test]
    fn summary_groups_by_category() {
        let report = WindowReport {
            elapsed_seconds: 60.0,
            records: vec![
                record("application", 100.0),
                record("application", 50.0),
                record("istio-control-plane", 25.0),
            ],
            drops: vec![],
        };

        let summary = report.summary_by_category();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].0, "application");
        assert_eq!(summary[0].1.pods, 2);
        assert!((summary[0].1.cpu_total_m - 150.0).abs() < f64::EPSILON);
        assert_eq!(summary[1].0, "istio-control-plane");
    }

    #[test]
    fn drop_reasons_count_and_sort() {
        let dropped = |reason: DropReason| DroppedPod {
            id: PodId::new("default", "geo-1-1"),
            category: "application".to_string(),
            service: "geo".to_string(),
            node: "node-0".to_string(),
            reason,
        };

        let report = WindowReport {
            elapsed_seconds: 60.0,
            records: vec![],
            drops: vec![
                dropped(DropReason::Disappeared),
                dropped(DropReason::CounterReset {
                    counter: "rx_bytes".to_string(),
                }),
                dropped(DropReason::Disappeared),
            ],
        };

        let reasons = report.drop_reasons();
        assert_eq!(reasons[0].0, "pod disappeared during measurement");
        assert_eq!(reasons[0].1, 2);
    }
}
