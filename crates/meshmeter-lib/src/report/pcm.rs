//! PCM memory-bandwidth CSV parser
//!
//! Intel PCM writes CSVs with a two-row header: the first row names the
//! metric group per column ("System", "Socket 0", ...) and the second names
//! the metric itself ("READ", "WRITE", ...). Group cells are blank for
//! continuation columns, so the group carries forward until the next
//! non-blank cell. Values under System/READ and System/WRITE are GB/s
//! samples; one summary averages them over every complete data row.

use serde::Serialize;
use tracing::warn;

/// Averaged system memory bandwidth over one PCM capture, in GB/s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryBandwidth {
    pub read_gb_s: f64,
    pub write_gb_s: f64,
    pub samples: usize,
}

impl MemoryBandwidth {
    pub fn total_gb_s(&self) -> f64 {
        self.read_gb_s + self.write_gb_s
    }
}

/// Parse a PCM CSV capture into averaged system bandwidth.
///
/// Returns `None` when the header rows are missing, the System READ/WRITE
/// columns cannot be located, or no data row carries parseable values in
/// both columns. Individual malformed rows are skipped, not fatal.
pub fn parse_memory_bandwidth(content: &str) -> Option<MemoryBandwidth> {
    let mut lines = content.lines();
    let groups: Vec<&str> = lines.next()?.split(',').map(str::trim).collect();
    let metrics: Vec<&str> = lines.next()?.split(',').map(str::trim).collect();

    let read_idx = find_column(&groups, &metrics, "System", "READ")?;
    let write_idx = find_column(&groups, &metrics, "System", "WRITE")?;

    let mut read_sum = 0.0;
    let mut write_sum = 0.0;
    let mut samples = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let read = fields.get(read_idx).and_then(|f| f.parse::<f64>().ok());
        let write = fields.get(write_idx).and_then(|f| f.parse::<f64>().ok());
        match (read, write) {
            (Some(r), Some(w)) => {
                read_sum += r;
                write_sum += w;
                samples += 1;
            }
            _ => {
                warn!("Skipping PCM row without numeric READ/WRITE values");
            }
        }
    }

    if samples == 0 {
        return None;
    }

    Some(MemoryBandwidth {
        read_gb_s: read_sum / samples as f64,
        write_gb_s: write_sum / samples as f64,
        samples,
    })
}

/// Locate the column whose (group, metric) header pair matches. Blank group
/// cells inherit the last non-blank group to their left.
fn find_column(groups: &[&str], metrics: &[&str], group: &str, metric: &str) -> Option<usize> {
    let mut current_group = "";
    for (idx, metric_name) in metrics.iter().enumerate() {
        if let Some(g) = groups.get(idx) {
            if !g.is_empty() {
                current_group = g;
            }
        }
        if current_group == group && *metric_name == metric {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Time,System,,,Socket 0,,
,,READ,WRITE,IO,READ,WRITE,IO
2024-01-01,00:00:01,10.5,5.5,0.2,10.5,5.5,0.2
2024-01-01,00:00:02,12.5,6.5,0.3,12.5,6.5,0.3
";

    #[test]
    fn averages_system_read_and_write() {
        let bw = parse_memory_bandwidth(SAMPLE).unwrap();
        assert_eq!(bw.samples, 2);
        assert!((bw.read_gb_s - 11.5).abs() < 1e-9);
        assert!((bw.write_gb_s - 6.0).abs() < 1e-9);
        assert!((bw.total_gb_s() - 17.5).abs() < 1e-9);
    }

    #[test]
    fn takes_system_columns_not_socket_columns() {
        let content = "\
Date,Time,System,,Socket 0,
,,READ,WRITE,READ,WRITE
2024-01-01,00:00:01,8.0,4.0,99.0,99.0
";
        let bw = parse_memory_bandwidth(content).unwrap();
        assert_eq!(bw.read_gb_s, 8.0);
        assert_eq!(bw.write_gb_s, 4.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let content = "\
Date,Time,System,
,,READ,WRITE
2024-01-01,00:00:01,10.0,5.0
2024-01-01,00:00:02,n/a,n/a
2024-01-01,00:00:03,20.0,15.0
";
        let bw = parse_memory_bandwidth(content).unwrap();
        assert_eq!(bw.samples, 2);
        assert_eq!(bw.read_gb_s, 15.0);
        assert_eq!(bw.write_gb_s, 10.0);
    }

    #[test]
    fn missing_columns_yield_none() {
        let content = "Date,Time\n,,\n2024-01-01,00:00:01\n";
        assert!(parse_memory_bandwidth(content).is_none());
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(parse_memory_bandwidth("").is_none());
        assert!(parse_memory_bandwidth("Date,Time,System,\n").is_none());
    }

    #[test]
    fn header_only_yields_none() {
        let content = "Date,Time,System,\n,,READ,WRITE\n";
        assert!(parse_memory_bandwidth(content).is_none());
    }
}
