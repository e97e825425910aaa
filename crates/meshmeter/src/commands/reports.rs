//! The `parse-report` and `parse-pcm` commands: fold external artifacts
//! into the output CSVs.

use anyhow::{Context, Result};
use chrono::Utc;
use meshmeter_lib::report::{parse_load_report, parse_memory_bandwidth};
use meshmeter_lib::sink::LatencyCsvSink;
use tabled::Tabled;

use crate::config::MeterConfig;
use crate::output::{format_opt_ms, print_success, print_table, print_warning, OutputFormat};

/// Row for the latency summary table
#[derive(Tabled, serde::Serialize)]
struct LatencyRow {
    #[tabled(rename = "Actual RPS")]
    actual_rps: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "P50")]
    p50: String,
    #[tabled(rename = "P90")]
    p90: String,
    #[tabled(rename = "P99")]
    p99: String,
    #[tabled(rename = "P99.9")]
    p999: String,
    #[tabled(rename = "Errors")]
    errors: String,
}

pub async fn parse_load(
    config: &MeterConfig,
    file: &str,
    rps: u32,
    latency_file: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read load report {file}"))?;
    let report = parse_load_report(&content);

    if report.actual_rps.is_none() && report.lat_p50_ms.is_none() {
        print_warning(&format!("No recognizable metrics in {file}"));
    }

    let rows = vec![LatencyRow {
        actual_rps: report
            .actual_rps
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string()),
        mean: format_opt_ms(report.lat_mean_ms),
        p50: format_opt_ms(report.lat_p50_ms),
        p90: format_opt_ms(report.lat_p90_ms),
        p99: format_opt_ms(report.lat_p99_ms),
        p999: format_opt_ms(report.lat_p999_ms),
        errors: report
            .error_rate_percent()
            .map(|r| format!("{r:.2}%"))
            .unwrap_or_else(|| report.total_errors().to_string()),
    }];
    print_table(&rows, format);

    let path = latency_file.unwrap_or_else(|| config.latency_file.clone());
    LatencyCsvSink::new(&path)
        .append(Utc::now(), rps, &report)
        .with_context(|| format!("Failed to append latency row to {path}"))?;
    print_success(&format!("Latency row for {rps} RPS appended to {path}"));
    Ok(())
}

pub async fn parse_pcm(file: &str, format: OutputFormat) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read PCM capture {file}"))?;

    let Some(bandwidth) = parse_memory_bandwidth(&content) else {
        print_warning(&format!("No System READ/WRITE samples found in {file}"));
        return Ok(());
    };

    #[derive(Tabled, serde::Serialize)]
    struct BandwidthRow {
        #[tabled(rename = "Samples")]
        samples: usize,
        #[tabled(rename = "Read GB/s")]
        read: String,
        #[tabled(rename = "Write GB/s")]
        write: String,
        #[tabled(rename = "Total GB/s")]
        total: String,
    }

    print_table(
        &[BandwidthRow {
            samples: bandwidth.samples,
            read: format!("{:.2}", bandwidth.read_gb_s),
            write: format!("{:.2}", bandwidth.write_gb_s),
            total: format!("{:.2}", bandwidth.total_gb_s()),
        }],
        format,
    );
    Ok(())
}
