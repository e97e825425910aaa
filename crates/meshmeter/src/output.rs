//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a millicore rate for table cells
pub fn format_millicores(value: f64) -> String {
    format!("{:.2}m", value)
}

/// Format a MiB gauge for table cells
pub fn format_mib(value: f64) -> String {
    format!("{:.2}Mi", value)
}

/// Format a KiB/s rate for table cells
pub fn format_kib_s(value: f64) -> String {
    format!("{:.2}", value)
}

/// Format an optional millisecond latency, `-` when absent
pub fn format_opt_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.2}ms", ms),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rates_and_gauges() {
        assert_eq!(format_millicores(123.456), "123.46m");
        assert_eq!(format_mib(64.0), "64.00Mi");
        assert_eq!(format_kib_s(1.005), "1.00");
        assert_eq!(format_opt_ms(Some(12.345)), "12.35ms");
        assert_eq!(format_opt_ms(None), "-");
    }
}
