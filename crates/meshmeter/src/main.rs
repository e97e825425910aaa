//! meshmeter - Service mesh resource overhead meter
//!
//! Measures per-pod CPU, memory, and network rates over a load window,
//! splitting CPU between application and sidecar containers, and folds
//! load-generator latency reports into the same experiment dataset.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{measure, reports};

/// Service mesh resource overhead meter
#[derive(Parser)]
#[command(name = "meshmeter")]
#[command(author, version, about = "Measure service mesh resource overhead", long_about = None)]
pub struct Cli {
    /// Kubernetes API proxy URL (a local `kubectl proxy`)
    #[arg(long, env = "MESHMETER_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one measurement window and append per-pod rates to the CSV
    Measure {
        /// Nominal offered load in requests per second, recorded with each row
        rps: u32,

        /// Window hold duration in seconds
        #[arg(long, default_value_t = 60)]
        duration: u64,

        /// Also measure mesh and Kubernetes system namespaces
        #[arg(long)]
        all_namespaces: bool,

        /// Mark rows as captured with sidecar injection enabled
        #[arg(long)]
        sidecar: bool,

        /// Metrics CSV path (defaults to MESHMETER_METRICS_FILE or k8s_full_metrics.csv)
        #[arg(long)]
        metrics_file: Option<String>,
    },

    /// Parse a load-generator report and append a latency row to the CSV
    ParseReport {
        /// Path to the load-generator text output
        file: String,

        /// Nominal offered load the report was captured at
        #[arg(long)]
        rps: u32,

        /// Latency CSV path (defaults to MESHMETER_LATENCY_FILE or latency_stats.csv)
        #[arg(long)]
        latency_file: Option<String>,
    },

    /// Summarize a PCM memory-bandwidth capture
    ParsePcm {
        /// Path to the PCM CSV capture
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_target(false))
        .init();

    let mut config = config::MeterConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    match cli.command {
        Commands::Measure {
            rps,
            duration,
            all_namespaces,
            sidecar,
            metrics_file,
        } => {
            measure::run(
                &config,
                measure::MeasureArgs {
                    rps,
                    duration_secs: duration,
                    all_namespaces,
                    sidecar_enabled: sidecar,
                    metrics_file,
                },
                cli.format,
            )
            .await
        }
        Commands::ParseReport {
            file,
            rps,
            latency_file,
        } => reports::parse_load(&config, &file, rps, latency_file, cli.format).await,
        Commands::ParsePcm { file } => reports::parse_pcm(&file, cli.format).await,
    }
}
