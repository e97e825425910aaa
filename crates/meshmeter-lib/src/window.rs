//! Measurement window driver
//!
//! One window is two snapshots bracketing a hold period: capture, wait,
//! capture again, then turn the counter deltas into per-pod rates. The
//! elapsed time fed to the rate computation is the real gap between the
//! two snapshot timestamps, not the nominal hold duration, so scheduling
//! jitter and slow collection passes do not skew the rates.

use crate::collector::SnapshotCollector;
use crate::config::NamespacePolicy;
use crate::delta;
use crate::error::MeterError;
use crate::models::WindowReport;
use crate::observability::MeterMetrics;
use std::time::Duration;
use tracing::info;

/// Run one complete measurement window against live sources.
pub async fn run_window(
    collector: &SnapshotCollector,
    policy: &NamespacePolicy,
    hold: Duration,
) -> Result<WindowReport, MeterError> {
    info!(hold_secs = hold.as_secs_f64(), "Starting measurement window");

    let start = collector.collect(policy).await?;
    info!(pods = start.len(), "First snapshot captured, holding load");

    tokio::time::sleep(hold).await;

    let end = collector.collect(policy).await?;
    info!(pods = end.len(), "Second snapshot captured");

    let report = delta::compute(&start, &end)?;
    MeterMetrics::new().inc_windows_completed();

    info!(
        elapsed_secs = report.elapsed_seconds,
        kept = report.kept(),
        dropped = report.dropped(),
        "Measurement window complete"
    );
    for (reason, count) in report.drop_reasons() {
        info!(%reason, count, "Pods excluded from window");
    }

    Ok(report)
}
