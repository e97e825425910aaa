//! Tolerant parser for wrk2 load-generator reports
//!
//! The report is free text whose shape varies with wrk2 version and flags.
//! Every extracted field is optional; a missing section never fails the
//! parse. Latency strings normalize to milliseconds.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn latency_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"Latency\s+([0-9.]+)(us|ms|s|m)\s+([0-9.]+)(us|ms|s|m)\s+([0-9.]+)(us|ms|s|m)",
        )
        .expect("invalid latency line regex")
    })
}

fn percentile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9]+\.[0-9]{3})%\s+([0-9.]+)(us|ms|s|m)")
            .expect("invalid percentile regex")
    })
}

fn requests_per_sec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Requests/sec:\s+([0-9.]+)").expect("invalid rps regex"))
}

fn transfer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Transfer/sec:\s+([0-9.]+)([KMGT]?B)").expect("invalid transfer regex")
    })
}

fn total_requests_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+)\s+requests in").expect("invalid totals regex"))
}

fn socket_errors_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"Socket errors:\s+connect\s+([0-9]+),\s+read\s+([0-9]+),\s+write\s+([0-9]+),\s+timeout\s+([0-9]+)",
        )
        .expect("invalid socket errors regex")
    })
}

fn non_2xx_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Non-2xx or 3xx responses:\s+([0-9]+)").expect("invalid non-2xx regex")
    })
}

/// Normalize a latency value with unit suffix to milliseconds.
pub fn latency_to_ms(value: f64, unit: &str) -> f64 {
    match unit {
        "us" => value / 1000.0,
        "ms" => value,
        "s" => value * 1000.0,
        "m" => value * 60.0 * 1000.0,
        _ => value,
    }
}

/// Parse a combined latency string such as `4.32ms` into milliseconds.
pub fn parse_latency_ms(raw: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9.]+)(us|ms|s|m)\s*$").expect("invalid latency string regex")
    });

    let caps = re.captures(raw.trim())?;
    let value: f64 = caps[1].parse().ok()?;
    Some(latency_to_ms(value, &caps[2]))
}

/// Extracted fields of one load-generator run. All latencies in ms.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub lat_mean_ms: Option<f64>,
    pub lat_stdev_ms: Option<f64>,
    pub lat_max_ms: Option<f64>,
    pub lat_p50_ms: Option<f64>,
    pub lat_p75_ms: Option<f64>,
    pub lat_p90_ms: Option<f64>,
    pub lat_p99_ms: Option<f64>,
    pub lat_p999_ms: Option<f64>,
    pub actual_rps: Option<f64>,
    pub transfer_per_sec: Option<String>,
    pub total_requests: Option<u64>,
    pub socket_errors: u64,
    pub timeout_errors: u64,
    pub non_2xx_responses: u64,
}

impl LoadReport {
    /// Socket errors plus non-2xx responses.
    pub fn total_errors(&self) -> u64 {
        self.socket_errors + self.non_2xx_responses
    }

    /// Errors as a percentage of total requests, when both are known.
    pub fn error_rate_percent(&self) -> Option<f64> {
        let total = self.total_requests?;
        if total == 0 {
            return None;
        }
        Some(self.total_errors() as f64 / total as f64 * 100.0)
    }
}

/// Parse a full wrk2 report. Never fails; unknown or absent sections leave
/// their fields unset.
pub fn parse(content: &str) -> LoadReport {
    let mut report = LoadReport::default();

    if let Some(caps) = latency_line_re().captures(content) {
        report.lat_mean_ms = parse_captured_latency(&caps, 1, 2);
        report.lat_stdev_ms = parse_captured_latency(&caps, 3, 4);
        report.lat_max_ms = parse_captured_latency(&caps, 5, 6);
    }

    for caps in percentile_re().captures_iter(content) {
        let value = parse_captured_latency(&caps, 2, 3);
        match &caps[1] {
            "50.000" => report.lat_p50_ms = value,
            "75.000" => report.lat_p75_ms = value,
            "90.000" => report.lat_p90_ms = value,
            "99.000" => report.lat_p99_ms = value,
            "99.900" => report.lat_p999_ms = value,
            _ => {}
        }
    }

    if let Some(caps) = requests_per_sec_re().captures(content) {
        report.actual_rps = caps[1].parse().ok();
    }

    if let Some(caps) = transfer_re().captures(content) {
        report.transfer_per_sec = Some(format!("{}{}", &caps[1], &caps[2]));
    }

    if let Some(caps) = total_requests_re().captures(content) {
        report.total_requests = caps[1].parse().ok();
    }

    if let Some(caps) = socket_errors_re().captures(content) {
        let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
        report.socket_errors = field(1) + field(2) + field(3) + field(4);
        report.timeout_errors = field(4);
    }

    if let Some(caps) = non_2xx_re().captures(content) {
        report.non_2xx_responses = caps[1].parse().unwrap_or(0);
    }

    report
}

fn parse_captured_latency(caps: &regex::Captures<'_>, value_idx: usize, unit_idx: usize) -> Option<f64> {
    let value: f64 = caps[value_idx].parse().ok()?;
    Some(latency_to_ms(value, &caps[unit_idx]))
}
