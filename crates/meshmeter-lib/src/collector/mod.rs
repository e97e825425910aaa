//! Snapshot collection from cluster metric sources
//!
//! Assembles one coherent [`Snapshot`] per call from two heterogeneous
//! sources: the kubelet stats-summary endpoint (per-container cumulative CPU
//! and memory gauges, one query per node) and a per-pod network counter read
//! fanned out through the bounded parallel fetcher.

mod fetcher;
mod kubelet;
mod netdev;

pub use fetcher::{fetch_all, FetchOptions};
pub use kubelet::{
    ContainerStats, CpuStats, KubeletStatsSource, MemoryStats, NodeSummary, PodRef, PodStats,
};
pub use netdev::{parse_net_dev, ExecNetSource};

use crate::config::NamespacePolicy;
use crate::error::MeterError;
use crate::models::{NetCounters, PodId, PodSample, Snapshot};
use crate::naming;
use crate::observability::MeterMetrics;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use async_trait::async_trait;

/// Default name of the mesh sidecar container inside application pods.
pub const DEFAULT_SIDECAR_CONTAINER: &str = "istio-proxy";

/// Per-node stats endpoint: cumulative CPU and memory gauges for every pod.
#[async_trait]
pub trait NodeStatsSource: Send + Sync {
    /// Names of all schedulable nodes in the cluster.
    async fn node_names(&self) -> Result<Vec<String>>;

    /// One node's stats summary.
    async fn node_summary(&self, node: &str) -> Result<NodeSummary>;
}

/// Per-pod cumulative network byte counters. May fail or hang; the parallel
/// fetcher applies the timeout and retry budget.
#[async_trait]
pub trait PodNetSource: Send + Sync {
    async fn read(&self, pod: &PodId) -> Result<NetCounters>;
}

/// Assembles point-in-time snapshots of the measured pod universe.
pub struct SnapshotCollector {
    stats: Arc<dyn NodeStatsSource>,
    net: Arc<dyn PodNetSource>,
    fetch_opts: FetchOptions,
    sidecar_container: String,
    metrics: MeterMetrics,
}

impl SnapshotCollector {
    pub fn new(stats: Arc<dyn NodeStatsSource>, net: Arc<dyn PodNetSource>) -> Self {
        Self {
            stats,
            net,
            fetch_opts: FetchOptions::default(),
            sidecar_container: DEFAULT_SIDECAR_CONTAINER.to_string(),
            metrics: MeterMetrics::new(),
        }
    }

    pub fn with_fetch_options(mut self, opts: FetchOptions) -> Self {
        self.fetch_opts = opts;
        self
    }

    pub fn with_sidecar_container(mut self, name: impl Into<String>) -> Self {
        self.sidecar_container = name.into();
        self
    }

    /// Assemble one snapshot of every pod selected by `policy`.
    ///
    /// Individual node failures degrade to partial data; the call errors only
    /// when the node list is unobtainable or every node query failed. Every
    /// pod that appears in the CPU/memory pass also gets a network reading,
    /// zero-valued on fetch failure, so it cannot vanish from the later
    /// delta join.
    pub async fn collect(&self, policy: &NamespacePolicy) -> Result<Snapshot, MeterError> {
        let start = Instant::now();

        let nodes = self
            .stats
            .node_names()
            .await
            .map_err(MeterError::NodeList)?;
        if nodes.is_empty() {
            return Err(MeterError::NodeList(anyhow::anyhow!(
                "node list query returned no nodes"
            )));
        }

        let mut snapshot = Snapshot::new(chrono::Utc::now());
        let mut failed_nodes = 0usize;

        for node in &nodes {
            let summary = match self.stats.node_summary(node).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(node = %node, error = %e, "Node stats query failed, continuing without it");
                    failed_nodes += 1;
                    continue;
                }
            };

            for pod_stats in summary.pods {
                let id = PodId::new(&pod_stats.pod_ref.namespace, &pod_stats.pod_ref.name);
                let Some(category) = policy.category(&id.namespace) else {
                    continue;
                };

                let mut cpu_total_ns = 0u64;
                let mut cpu_app_ns = 0u64;
                let mut cpu_sidecar_ns = 0u64;
                for container in &pod_stats.containers {
                    let usage = container.cpu_usage_nanoseconds();
                    cpu_total_ns += usage;
                    if container.name == self.sidecar_container {
                        cpu_sidecar_ns += usage;
                    } else {
                        cpu_app_ns += usage;
                    }
                }

                let sample = PodSample {
                    category: category.to_string(),
                    service: naming::service_for(&id.name).to_string(),
                    node: node.clone(),
                    cpu_total_ns,
                    cpu_app_ns,
                    cpu_sidecar_ns,
                    rx_bytes: 0,
                    tx_bytes: 0,
                    mem_working_set_bytes: pod_stats.working_set_bytes(),
                    mem_rss_bytes: pod_stats.rss_bytes(),
                };
                snapshot.pods.insert(id, sample);
            }
        }

        if failed_nodes == nodes.len() {
            return Err(MeterError::AllNodesFailed { nodes: nodes.len() });
        }

        // Network pass: one bounded-parallel read per pod discovered above.
        let ids: Vec<PodId> = snapshot.pods.keys().cloned().collect();
        if !ids.is_empty() {
            let counters = fetch_all(ids, Arc::clone(&self.net), &self.fetch_opts).await;
            for (id, net) in counters {
                if let Some(sample) = snapshot.pods.get_mut(&id) {
                    sample.rx_bytes = net.rx_bytes;
                    sample.tx_bytes = net.tx_bytes;
                }
            }
        }

        // Stamp after assembly so elapsed time between two snapshots covers
        // the real gap, including collection latency.
        snapshot.taken_at = chrono::Utc::now();

        let elapsed = start.elapsed();
        self.metrics
            .observe_snapshot_assembly(elapsed.as_secs_f64());
        info!(
            pods = snapshot.len(),
            nodes = nodes.len(),
            failed_nodes,
            elapsed_ms = elapsed.as_millis(),
            "Snapshot assembled"
        );
        debug!(namespaces = ?policy.namespaces(), "Snapshot scope");

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::kubelet::{ContainerStats, CpuStats, MemoryStats, PodRef, PodStats};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStats {
        nodes: Vec<String>,
        summaries: Mutex<HashMap<String, NodeSummary>>,
    }

    #[async_trait]
    impl NodeStatsSource for FakeStats {
        async fn node_names(&self) -> Result<Vec<String>> {
            Ok(self.nodes.clone())
        }

        async fn node_summary(&self, node: &str) -> Result<NodeSummary> {
            self.summaries
                .lock()
                .unwrap()
                .get(node)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("node {node} unreachable"))
        }
    }

    struct FakeNet {
        counters: HashMap<PodId, NetCounters>,
    }

    #[async_trait]
    impl PodNetSource for FakeNet {
        async fn read(&self, pod: &PodId) -> Result<NetCounters> {
            self.counters
                .get(pod)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("exec failed"))
        }
    }

    fn pod_stats(namespace: &str, name: &str, app_ns: u64, sidecar_ns: u64) -> PodStats {
        let mut containers = vec![ContainerStats {
            name: "app".to_string(),
            cpu: Some(CpuStats {
                usage_core_nano_seconds: Some(app_ns),
            }),
        }];
        if sidecar_ns > 0 {
            containers.push(ContainerStats {
                name: DEFAULT_SIDECAR_CONTAINER.to_string(),
                cpu: Some(CpuStats {
                    usage_core_nano_seconds: Some(sidecar_ns),
                }),
            });
        }

        PodStats {
            pod_ref: PodRef {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            containers,
            memory: Some(MemoryStats {
                working_set_bytes: Some(64 * 1024 * 1024),
                rss_bytes: Some(60 * 1024 * 1024),
            }),
        }
    }

    fn collector_with(
        nodes: Vec<(&str, Vec<PodStats>)>,
        net: HashMap<PodId, NetCounters>,
    ) -> SnapshotCollector {
        let node_names: Vec<String> = nodes.iter().map(|(n, _)| n.to_string()).collect();
        let summaries = nodes
            .into_iter()
            .map(|(n, pods)| (n.to_string(), NodeSummary { pods }))
            .collect();

        SnapshotCollector::new(
            Arc::new(FakeStats {
                nodes: node_names,
                summaries: Mutex::new(summaries),
            }),
            Arc::new(FakeNet { counters: net }),
        )
    }

    #[tokio::test]
    async fn collects_cpu_memory_and_network() {
        let id = PodId::new("default", "frontend-abc123-xy1");
        let mut net = HashMap::new();
        net.insert(id.clone(), NetCounters::new(5000, 7000));

        let collector = collector_with(
            vec![(
                "node-0",
                vec![pod_stats("default", "frontend-abc123-xy1", 1_000_000, 250_000)],
            )],
            net,
        );

        let snapshot = collector
            .collect(&NamespacePolicy::application_only())
            .await
            .unwrap();

        let sample = &snapshot.pods[&id];
        assert_eq!(sample.cpu_total_ns, 1_250_000);
        assert_eq!(sample.cpu_app_ns, 1_000_000);
        assert_eq!(sample.cpu_sidecar_ns, 250_000);
        assert_eq!(sample.rx_bytes, 5000);
        assert_eq!(sample.tx_bytes, 7000);
        assert_eq!(sample.service, "frontend");
        assert_eq!(sample.category, "application");
        assert_eq!(sample.node, "node-0");
    }

    #[tokio::test]
    async fn filters_unmeasured_namespaces() {
        let collector = collector_with(
            vec![(
                "node-0",
                vec![
                    pod_stats("default", "geo-abc-1", 1000, 0),
                    pod_stats("istio-system", "istiod-abc-1", 1000, 0),
                ],
            )],
            HashMap::new(),
        );

        let snapshot = collector
            .collect(&NamespacePolicy::application_only())
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.pods.contains_key(&PodId::new("default", "geo-abc-1")));
    }

    #[tokio::test]
    async fn net_fetch_failure_defaults_to_zero_not_omission() {
        let collector = collector_with(
            vec![("node-0", vec![pod_stats("default", "geo-abc-1", 1000, 0)])],
            HashMap::new(), // every net read fails
        );

        let snapshot = collector
            .collect(&NamespacePolicy::application_only())
            .await
            .unwrap();

        let sample = &snapshot.pods[&PodId::new("default", "geo-abc-1")];
        assert_eq!(sample.rx_bytes, 0);
        assert_eq!(sample.tx_bytes, 0);
    }

    #[tokio::test]
    async fn partial_node_failure_degrades() {
        // node-1 has no summary registered, so its query fails.
        let collector = SnapshotCollector::new(
            Arc::new(FakeStats {
                nodes: vec!["node-0".to_string(), "node-1".to_string()],
                summaries: Mutex::new(
                    [(
                        "node-0".to_string(),
                        NodeSummary {
                            pods: vec![pod_stats("default", "geo-abc-1", 1000, 0)],
                        },
                    )]
                    .into_iter()
                    .collect(),
                ),
            }),
            Arc::new(FakeNet {
                counters: HashMap::new(),
            }),
        );

        let snapshot = collector
            .collect(&NamespacePolicy::application_only())
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn all_nodes_failing_is_fatal() {
        let collector = SnapshotCollector::new(
            Arc::new(FakeStats {
                nodes: vec!["node-0".to_string()],
                summaries: Mutex::new(HashMap::new()),
            }),
            Arc::new(FakeNet {
                counters: HashMap::new(),
            }),
        );

        let err = collector
            .collect(&NamespacePolicy::application_only())
            .await
            .unwrap_err();
        assert!(matches!(err, MeterError::AllNodesFailed { nodes: 1 }));
    }
}
