//! Per-pod network counters via remote command execution
//!
//! Kubelet summaries do not expose per-pod network counters for all CNI
//! setups, so this source reads `/proc/net/dev` inside the pod through
//! `kubectl exec`. The eth0 interface carries pod traffic; net1 appears on
//! multi-network (Multus) pods and takes precedence when present first.

use super::PodNetSource;
use crate::models::{NetCounters, PodId};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Interfaces whose counters represent pod traffic.
const POD_INTERFACES: &[&str] = &["eth0", "net1"];

/// Parse `/proc/net/dev` contents into cumulative (rx, tx) byte counters.
///
/// Format per line: `iface: rx_bytes rx_packets ... tx_bytes ...` where
/// rx_bytes is field 0 and tx_bytes is field 8 after the colon. Returns the
/// first matching pod interface.
pub fn parse_net_dev(content: &str) -> Result<NetCounters> {
    for line in content.lines() {
        let Some((iface, fields)) = line.split_once(':') else {
            continue;
        };
        if !POD_INTERFACES.contains(&iface.trim()) {
            continue;
        }

        let fields: Vec<&str> = fields.split_whitespace().collect();
        if fields.len() < 9 {
            bail!("interface {} line has {} fields, expected 9+", iface.trim(), fields.len());
        }

        let rx_bytes = fields[0]
            .parse()
            .with_context(|| format!("bad rx_bytes field {:?}", fields[0]))?;
        let tx_bytes = fields[8]
            .parse()
            .with_context(|| format!("bad tx_bytes field {:?}", fields[8]))?;
        return Ok(NetCounters::new(rx_bytes, tx_bytes));
    }

    bail!("no pod network interface (eth0/net1) in /proc/net/dev output")
}

/// [`PodNetSource`] reading `/proc/net/dev` through `kubectl exec`.
pub struct ExecNetSource {
    kubectl_path: String,
}

impl ExecNetSource {
    pub fn new() -> Self {
        Self {
            kubectl_path: "kubectl".to_string(),
        }
    }

    pub fn with_kubectl_path(kubectl_path: impl Into<String>) -> Self {
        Self {
            kubectl_path: kubectl_path.into(),
        }
    }
}

impl Default for ExecNetSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PodNetSource for ExecNetSource {
    async fn read(&self, pod: &PodId) -> Result<NetCounters> {
        let output = Command::new(&self.kubectl_path)
            .args([
                "exec",
                "-n",
                &pod.namespace,
                &pod.name,
                "--",
                "cat",
                "/proc/net/dev",
            ])
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn kubectl exec for {pod}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "kubectl exec for {pod} exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_net_dev(&stdout).with_context(|| format!("unparseable /proc/net/dev from {pod}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  162360    1470    0    0    0     0          0         0   162360    1470    0    0    0     0       0          0
  eth0: 5000321   40210    0    0    0     0          0         0  7000456   38990    0    0    0     0       0          0
";

    #[test]
    fn parses_eth0_counters() {
        let counters = parse_net_dev(SAMPLE).unwrap();
        assert_eq!(counters.rx_bytes, 5000321);
        assert_eq!(counters.tx_bytes, 7000456);
    }

    #[test]
    fn prefers_first_pod_interface() {
        let content = "\
  net1: 111 1 0 0 0 0 0 0 222 1 0 0 0 0 0 0
  eth0: 333 1 0 0 0 0 0 0 444 1 0 0 0 0 0 0
";
        let counters = parse_net_dev(content).unwrap();
        assert_eq!(counters.rx_bytes, 111);
        assert_eq!(counters.tx_bytes, 222);
    }

    #[test]
    fn loopback_only_is_an_error() {
        let content = "    lo: 162360 1470 0 0 0 0 0 0 162360 1470 0 0 0 0 0 0\n";
        assert!(parse_net_dev(content).is_err());
    }

    #[test]
    fn truncated_line_is_an_error() {
        let content = "  eth0: 5000321 40210 0\n";
        assert!(parse_net_dev(content).is_err());
    }

    #[test]
    fn garbage_counter_is_an_error() {
        let content = "  eth0: abc 1 0 0 0 0 0 0 444 1 0 0 0 0 0 0\n";
        assert!(parse_net_dev(content).is_err());
    }
}
