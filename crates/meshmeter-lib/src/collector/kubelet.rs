//! Kubelet stats-summary source
//!
//! Reads per-pod cumulative CPU and memory gauges from the kubelet
//! `/stats/summary` endpoint, reached through a `kubectl proxy` instance:
//! - `GET {base}/api/v1/nodes` for the node list
//! - `GET {base}/api/v1/nodes/{node}/proxy/stats/summary` per node
//!
//! The summary models keep every field optional; kubelets of different
//! versions omit sections freely and a missing value reads as zero.

use super::NodeStatsSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default address of a local `kubectl proxy`.
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8001";

/// Stats summary for one node: the pods it hosts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSummary {
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    pub pod_ref: PodRef,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
    #[serde(default)]
    pub memory: Option<MemoryStats>,
}

impl PodStats {
    pub fn working_set_bytes(&self) -> u64 {
        self.memory
            .as_ref()
            .and_then(|m| m.working_set_bytes)
            .unwrap_or(0)
    }

    pub fn rss_bytes(&self) -> u64 {
        self.memory.as_ref().and_then(|m| m.rss_bytes).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStats {
    pub name: String,
    #[serde(default)]
    pub cpu: Option<CpuStats>,
}

impl ContainerStats {
    pub fn cpu_usage_nanoseconds(&self) -> u64 {
        self.cpu
            .as_ref()
            .and_then(|c| c.usage_core_nano_seconds)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    #[serde(default)]
    pub usage_core_nano_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    #[serde(default)]
    pub working_set_bytes: Option<u64>,
    #[serde(default)]
    pub rss_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<NodeItem>,
}

#[derive(Debug, Deserialize)]
struct NodeItem {
    metadata: NodeMetadata,
}

#[derive(Debug, Deserialize)]
struct NodeMetadata {
    name: String,
}

/// [`NodeStatsSource`] over the Kubernetes API proxy.
pub struct KubeletStatsSource {
    client: reqwest::Client,
    base_url: String,
}

impl KubeletStatsSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_PROXY_URL)
    }
}

#[async_trait]
impl NodeStatsSource for KubeletStatsSource {
    async fn node_names(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/v1/nodes", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query node list (is kubectl proxy running?)")?
            .error_for_status()
            .context("Node list query rejected")?;

        let nodes: NodeList = response
            .json()
            .await
            .context("Failed to parse node list response")?;

        Ok(nodes.items.into_iter().map(|n| n.metadata.name).collect())
    }

    async fn node_summary(&self, node: &str) -> Result<NodeSummary> {
        let url = format!("{}/api/v1/nodes/{}/proxy/stats/summary", self.base_url, node);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query stats summary for node {node}"))?
            .error_for_status()
            .with_context(|| format!("Stats summary query rejected for node {node}"))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse stats summary for node {node}"))
    }
}
