//! Meter configuration

use anyhow::Result;
use serde::Deserialize;

/// Meter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    /// Kubernetes API proxy address (a local `kubectl proxy`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Maximum concurrent per-pod network reads
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Timeout per network read attempt in seconds
    #[serde(default = "default_net_timeout")]
    pub net_timeout_secs: u64,

    /// Attempts per pod before zeroing its network counters
    #[serde(default = "default_net_attempts")]
    pub net_attempts: u32,

    /// Name of the mesh sidecar container inside application pods
    #[serde(default = "default_sidecar_container")]
    pub sidecar_container: String,

    /// Output CSV for per-pod resource rates
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    /// Output CSV for load-generator latency rows
    #[serde(default = "default_latency_file")]
    pub latency_file: String,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_max_workers() -> usize {
    10
}

fn default_net_timeout() -> u64 {
    5
}

fn default_net_attempts() -> u32 {
    2
}

fn default_sidecar_container() -> String {
    "istio-proxy".to_string()
}

fn default_metrics_file() -> String {
    "k8s_full_metrics.csv".to_string()
}

fn default_latency_file() -> String {
    "latency_stats.csv".to_string()
}

impl MeterConfig {
    /// Load configuration from MESHMETER_-prefixed environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MESHMETER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| MeterConfig {
            api_url: default_api_url(),
            max_workers: default_max_workers(),
            net_timeout_secs: default_net_timeout(),
            net_attempts: default_net_attempts(),
            sidecar_container: default_sidecar_container(),
            metrics_file: default_metrics_file(),
            latency_file: default_latency_file(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MeterConfig::load().unwrap();
        assert_eq!(config.max_workers, 10);
        assert_eq!(config.net_timeout_secs, 5);
        assert_eq!(config.net_attempts, 2);
        assert_eq!(config.sidecar_container, "istio-proxy");
    }
}
