//! End-to-end window test: two snapshots through the collector, rates out.

use anyhow::Result;
use meshmeter_lib::collector::{
    async_trait, ContainerStats, CpuStats, MemoryStats, NodeStatsSource, NodeSummary, PodNetSource,
    PodRef, PodStats, SnapshotCollector,
};
use meshmeter_lib::models::{DropReason, NetCounters, PodId};
use meshmeter_lib::window::run_window;
use meshmeter_lib::NamespacePolicy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Shared collect counter; the first collect sees phase 0, the second phase 1.
struct Phase(AtomicUsize);

impl Phase {
    fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst).saturating_sub(1)
    }
}

struct TwoPhaseStats {
    phase: Arc<Phase>,
}

fn pod(namespace: &str, name: &str, app_ns: u64, sidecar_ns: u64, ws: u64, rss: u64) -> PodStats {
    PodStats {
        pod_ref: PodRef {
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        containers: vec![
            ContainerStats {
                name: "app".to_string(),
                cpu: Some(CpuStats {
                    usage_core_nano_seconds: Some(app_ns),
                }),
            },
            ContainerStats {
                name: "istio-proxy".to_string(),
                cpu: Some(CpuStats {
                    usage_core_nano_seconds: Some(sidecar_ns),
                }),
            },
        ],
        memory: Some(MemoryStats {
            working_set_bytes: Some(ws),
            rss_bytes: Some(rss),
        }),
    }
}

#[async_trait]
impl NodeStatsSource for TwoPhaseStats {
    async fn node_names(&self) -> Result<Vec<String>> {
        self.phase.0.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["node-0".to_string()])
    }

    async fn node_summary(&self, _node: &str) -> Result<NodeSummary> {
        let pods = match self.phase.current() {
            0 => vec![
                pod("default", "frontend-5f6d8f7b9c-xv2m1", 1_000_000_000, 500_000_000, 100 * MIB, 90 * MIB),
                pod("default", "geo-abc123-x1", 2_000_000_000, 0, 50 * MIB, 45 * MIB),
                pod("default", "profile-abc123-x1", 3_000_000_000, 0, 50 * MIB, 45 * MIB),
            ],
            // profile pod is gone by the second snapshot.
            _ => vec![
                pod("default", "frontend-5f6d8f7b9c-xv2m1", 3_000_000_000, 1_000_000_000, 96 * MIB, 92 * MIB),
                pod("default", "geo-abc123-x1", 2_500_000_000, 0, 50 * MIB, 45 * MIB),
            ],
        };
        Ok(NodeSummary { pods })
    }
}

struct TwoPhaseNet {
    phase: Arc<Phase>,
}

#[async_trait]
impl PodNetSource for TwoPhaseNet {
    async fn read(&self, pod: &PodId) -> Result<NetCounters> {
        let second = self.phase.current() > 0;
        Ok(match pod.name.as_str() {
            "frontend-5f6d8f7b9c-xv2m1" => {
                if second {
                    NetCounters::new(10_000, 20_000)
                } else {
                    NetCounters::new(4_000, 8_000)
                }
            }
            // Receive counter goes backwards: restart mid-window.
            "geo-abc123-x1" => {
                if second {
                    NetCounters::new(3_000, 2_000)
                } else {
                    NetCounters::new(5_000, 1_000)
                }
            }
            _ => NetCounters::new(0, 0),
        })
    }
}

#[tokio::test]
async fn full_window_produces_rates_and_audited_drops() {
    let phase = Arc::new(Phase(AtomicUsize::new(0)));
    let collector = SnapshotCollector::new(
        Arc::new(TwoPhaseStats {
            phase: Arc::clone(&phase),
        }),
        Arc::new(TwoPhaseNet { phase }),
    );
    let policy = NamespacePolicy::application_only();

    let report = run_window(&collector, &policy, Duration::from_millis(50))
        .await
        .unwrap();

    assert!(report.elapsed_seconds > 0.0);
    assert_eq!(report.kept(), 1);
    assert_eq!(report.dropped(), 2);

    let record = &report.records[0];
    assert_eq!(record.id, PodId::new("default", "frontend-5f6d8f7b9c-xv2m1"));
    assert_eq!(record.service, "frontend");
    assert_eq!(record.category, "application");
    assert_eq!(record.node, "node-0");

    // Rates depend on measured wall time; only their signs and relative
    // shape are stable here.
    assert!(record.cpu_total_m > 0.0);
    assert!(record.cpu_app_m > 0.0);
    assert!(record.cpu_sidecar_m > 0.0);
    assert!(record.cpu_app_m > record.cpu_sidecar_m);
    assert!(record.rx_kib_s > 0.0);
    assert!(record.tx_kib_s > record.rx_kib_s);

    // Memory gauges come verbatim from the second snapshot.
    assert!((record.mem_working_set_mib - 96.0).abs() < 1e-9);
    assert!((record.mem_rss_mib - 92.0).abs() < 1e-9);
    assert!((record.mem_delta_mib - (-4.0)).abs() < 1e-9);

    let geo = report
        .drops
        .iter()
        .find(|d| d.id.name == "geo-abc123-x1")
        .unwrap();
    assert_eq!(
        geo.reason,
        DropReason::CounterReset {
            counter: "rx_bytes".to_string()
        }
    );

    let profile = report
        .drops
        .iter()
        .find(|d| d.id.name == "profile-abc123-x1")
        .unwrap();
    assert_eq!(profile.reason, DropReason::Disappeared);
}
