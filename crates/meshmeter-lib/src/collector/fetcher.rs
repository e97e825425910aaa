//! Bounded-parallel network counter fetch
//!
//! Fans a per-pod counter read out over a fixed worker budget. One pod's
//! failure never blocks or fails the batch: an exhausted retry budget records
//! zeroed counters for that pod and moves on. The result map always contains
//! exactly one entry per requested pod.

use super::PodNetSource;
use crate::models::{NetCounters, PodId};
use crate::observability::MeterMetrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Concurrency and retry budget for the network fetch pass.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum concurrent per-pod reads.
    pub max_workers: usize,
    /// Timeout applied to each individual read attempt.
    pub timeout: Duration,
    /// Total attempts per pod before recording a zero-valued failure marker.
    pub attempts: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_workers: 10,
            timeout: Duration::from_secs(5),
            attempts: 2,
        }
    }
}

/// Read network counters for every pod, at most `max_workers` at a time.
///
/// Returns one entry per requested pod; pods whose reads failed after the
/// full retry budget map to [`NetCounters::zero`].
pub async fn fetch_all(
    pods: Vec<PodId>,
    source: Arc<dyn PodNetSource>,
    opts: &FetchOptions,
) -> HashMap<PodId, NetCounters> {
    let semaphore = Arc::new(Semaphore::new(opts.max_workers.max(1)));
    let metrics = MeterMetrics::new();

    let mut handles = Vec::with_capacity(pods.len());
    for pod in pods {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let metrics = metrics.clone();
        let opts = opts.clone();

        handles.push(tokio::spawn(async move {
            // Semaphore is never closed while tasks run, so acquire cannot fail.
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            let counters = read_with_retry(&pod, source.as_ref(), &opts, &metrics).await;
            (pod, counters)
        }));
    }

    let mut results = HashMap::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((pod, counters)) => {
                results.insert(pod, counters);
            }
            Err(e) => {
                // A panicked read task loses its pod id; the snapshot keeps
                // the zero default written at assembly time.
                warn!(error = %e, "Network fetch task panicked");
            }
        }
    }

    results
}

/// One pod's read with timeout and bounded retries. Never errors; the failure
/// marker is part of the contract.
async fn read_with_retry(
    pod: &PodId,
    source: &dyn PodNetSource,
    opts: &FetchOptions,
    metrics: &MeterMetrics,
) -> NetCounters {
    let mut last_reason = String::new();

    for attempt in 1..=opts.attempts.max(1) {
        match tokio::time::timeout(opts.timeout, source.read(pod)).await {
            Ok(Ok(counters)) => return counters,
            Ok(Err(e)) => {
                last_reason = e.to_string();
                debug!(pod = %pod, attempt, error = %e, "Network read failed");
            }
            Err(_) => {
                last_reason = format!("timeout after {:?}", opts.timeout);
                debug!(pod = %pod, attempt, timeout = ?opts.timeout, "Network read timed out");
            }
        }
        metrics.inc_net_fetch_retries();
    }

    metrics.inc_net_fetch_failures();
    warn!(
        pod = %pod,
        attempts = opts.attempts,
        reason = %last_reason,
        "Network read gave up, recording zero counters"
    );
    NetCounters::zero()
}
