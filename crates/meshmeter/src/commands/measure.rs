//! The `measure` command: run one measurement window against the cluster

use anyhow::{Context, Result};
use chrono::Utc;
use meshmeter_lib::collector::{ExecNetSource, FetchOptions, KubeletStatsSource};
use meshmeter_lib::models::WindowReport;
use meshmeter_lib::sink::MetricsCsvSink;
use meshmeter_lib::window::run_window;
use meshmeter_lib::{NamespacePolicy, SnapshotCollector};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tracing::debug;

use crate::config::MeterConfig;
use crate::output::{
    format_kib_s, format_mib, format_millicores, print_info, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for the per-category summary table
#[derive(Tabled, serde::Serialize)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Pods")]
    pods: usize,
    #[tabled(rename = "CPU Total")]
    cpu_total: String,
    #[tabled(rename = "Memory WS")]
    memory_ws: String,
    #[tabled(rename = "Net RX KiB/s")]
    net_rx: String,
    #[tabled(rename = "Net TX KiB/s")]
    net_tx: String,
}

pub struct MeasureArgs {
    pub rps: u32,
    pub duration_secs: u64,
    pub all_namespaces: bool,
    pub sidecar_enabled: bool,
    pub metrics_file: Option<String>,
}

pub async fn run(config: &MeterConfig, args: MeasureArgs, format: OutputFormat) -> Result<()> {
    debug!(
        api_url = %config.api_url,
        max_workers = config.max_workers,
        sidecar_container = %config.sidecar_container,
        "Meter configured"
    );

    let stats = KubeletStatsSource::new(&config.api_url)?;
    let net = ExecNetSource::new();

    let collector = SnapshotCollector::new(Arc::new(stats), Arc::new(net))
        .with_fetch_options(FetchOptions {
            max_workers: config.max_workers,
            timeout: Duration::from_secs(config.net_timeout_secs),
            attempts: config.net_attempts,
        })
        .with_sidecar_container(&config.sidecar_container);

    let policy = NamespacePolicy::from_flags(args.all_namespaces);
    print_info(&format!(
        "Measuring {} namespaces for {}s at {} RPS",
        policy.namespaces().len(),
        args.duration_secs,
        args.rps
    ));

    let report = run_window(&collector, &policy, Duration::from_secs(args.duration_secs)).await?;

    let path = args
        .metrics_file
        .clone()
        .unwrap_or_else(|| config.metrics_file.clone());
    let sink = MetricsCsvSink::new(&path);
    sink.append(Utc::now(), args.rps, args.sidecar_enabled, &report)
        .with_context(|| format!("Failed to append metrics to {path}"))?;

    print_report(&report, format);
    print_success(&format!(
        "Window complete: {} pods kept, {} dropped, appended to {}",
        report.kept(),
        report.dropped(),
        path
    ));
    Ok(())
}

fn print_report(report: &WindowReport, format: OutputFormat) {
    let rows: Vec<CategoryRow> = report
        .summary_by_category()
        .into_iter()
        .map(|(category, totals)| CategoryRow {
            category,
            pods: totals.pods,
            cpu_total: format_millicores(totals.cpu_total_m),
            memory_ws: format_mib(totals.mem_working_set_mib),
            net_rx: format_kib_s(totals.rx_kib_s),
            net_tx: format_kib_s(totals.tx_kib_s),
        })
        .collect();
    print_table(&rows, format);

    for (reason, count) in report.drop_reasons() {
        print_warning(&format!("{count} pod(s) dropped: {reason}"));
    }
}
