//! Append-only CSV sinks for measurement output
//!
//! Both sinks append one run's rows to a long-lived file so that repeated
//! invocations at different load levels accumulate into a single dataset.
//! The header is written only when the file is new or empty. Rounding to
//! two decimals happens here, at serialization, never in the compute path.

use crate::error::MeterError;
use crate::models::{DroppedPod, WindowReport};
use crate::report::LoadReport;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const METRICS_HEADER: &str = "Timestamp,RPS,Namespace,Category,Service,Pod,Node,\
CPU_Total(m),CPU_App(m),CPU_Sidecar(m),\
Memory_WorkingSet(Mi),Memory_RSS(Mi),Memory_Delta(Mi),\
Net_RX(KB/s),Net_TX(KB/s),Sidecar_Enabled,Dropped,Drop_Reason";

const LATENCY_HEADER: &str = "Timestamp,RPS,Actual_RPS,Total_Requests,\
Lat_Mean(ms),Lat_Stdev(ms),Lat_Max(ms),\
P50(ms),P75(ms),P90(ms),P99(ms),P99.9(ms),\
Transfer/sec,Socket_Errors,Timeout_Errors,Non_2xx,Error_Rate(%)";

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.2}")
}

fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

fn open_appending(path: &Path) -> std::io::Result<(std::fs::File, bool)> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok((file, needs_header))
}

/// Per-pod resource rate rows, one file per experiment.
pub struct MetricsCsvSink {
    path: PathBuf,
}

impl MetricsCsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every record of a window, plus one audit row per dropped pod.
    pub fn append(
        &self,
        timestamp: DateTime<Utc>,
        rps: u32,
        sidecar_enabled: bool,
        report: &WindowReport,
    ) -> Result<(), MeterError> {
        let (mut file, needs_header) = open_appending(&self.path)?;
        if needs_header {
            writeln!(file, "{METRICS_HEADER}")?;
        }

        let stamp = timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        for record in &report.records {
            writeln!(
                file,
                "{stamp},{rps},{ns},{cat},{svc},{pod},{node},{cpu_t},{cpu_a},{cpu_s},{ws},{rss},{md},{rx},{tx},{sidecar},false,",
                ns = escape(&record.id.namespace),
                cat = escape(&record.category),
                svc = escape(&record.service),
                pod = escape(&record.id.name),
                node = escape(&record.node),
                cpu_t = fmt_f64(record.cpu_total_m),
                cpu_a = fmt_f64(record.cpu_app_m),
                cpu_s = fmt_f64(record.cpu_sidecar_m),
                ws = fmt_f64(record.mem_working_set_mib),
                rss = fmt_f64(record.mem_rss_mib),
                md = fmt_f64(record.mem_delta_mib),
                rx = fmt_f64(record.rx_kib_s),
                tx = fmt_f64(record.tx_kib_s),
                sidecar = sidecar_enabled,
            )?;
        }

        for dropped in &report.drops {
            self.write_audit_row(&mut file, &stamp, rps, sidecar_enabled, dropped)?;
        }

        file.flush()?;
        debug!(
            path = %self.path.display(),
            records = report.records.len(),
            drops = report.drops.len(),
            "Appended window to metrics CSV"
        );
        Ok(())
    }

    fn write_audit_row(
        &self,
        file: &mut std::fs::File,
        stamp: &str,
        rps: u32,
        sidecar_enabled: bool,
        dropped: &DroppedPod,
    ) -> std::io::Result<()> {
        writeln!(
            file,
            "{stamp},{rps},{ns},{cat},{svc},{pod},{node},,,,,,,,,{sidecar},true,{reason}",
            ns = escape(&dropped.id.namespace),
            cat = escape(&dropped.category),
            svc = escape(&dropped.service),
            pod = escape(&dropped.id.name),
            node = escape(&dropped.node),
            sidecar = sidecar_enabled,
            reason = escape(&dropped.reason.to_string()),
        )
    }
}

/// Load-generator latency rows, one per run.
pub struct LatencyCsvSink {
    path: PathBuf,
}

impl LatencyCsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        timestamp: DateTime<Utc>,
        rps: u32,
        report: &LoadReport,
    ) -> Result<(), MeterError> {
        let (mut file, needs_header) = open_appending(&self.path)?;
        if needs_header {
            writeln!(file, "{LATENCY_HEADER}")?;
        }

        writeln!(
            file,
            "{stamp},{rps},{actual},{total},{mean},{stdev},{max},{p50},{p75},{p90},{p99},{p999},{transfer},{sock},{timeout},{non2xx},{err_rate}",
            stamp = timestamp.format("%Y-%m-%d %H:%M:%S"),
            actual = fmt_opt_f64(report.actual_rps),
            total = report.total_requests.map(|t| t.to_string()).unwrap_or_default(),
            mean = fmt_opt_f64(report.lat_mean_ms),
            stdev = fmt_opt_f64(report.lat_stdev_ms),
            max = fmt_opt_f64(report.lat_max_ms),
            p50 = fmt_opt_f64(report.lat_p50_ms),
            p75 = fmt_opt_f64(report.lat_p75_ms),
            p90 = fmt_opt_f64(report.lat_p90_ms),
            p99 = fmt_opt_f64(report.lat_p99_ms),
            p999 = fmt_opt_f64(report.lat_p999_ms),
            transfer = escape(report.transfer_per_sec.as_deref().unwrap_or("")),
            sock = report.socket_errors,
            timeout = report.timeout_errors,
            non2xx = report.non_2xx_responses,
            err_rate = fmt_opt_f64(report.error_rate_percent()),
        )?;

        file.flush()?;
        Ok(())
    }
}
