//! CLI entry point for the airline delay report.
//!
//! Runs the whole pipeline once: load the monthly delay table, clean it,
//! aggregate it, render the charts and write the dashboard exports.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use airline_delays::config::{
    DEFAULT_EXPORT_DIR, DEFAULT_INPUT, DEFAULT_TOP_AIRPORTS, DEFAULT_VISUALIZATIONS_DIR,
    PipelineConfig,
};
use airline_delays::output::print_json;
use airline_delays::pipeline::Pipeline;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "airline_delays")]
#[command(about = "Aggregate, chart and export monthly US airline delay statistics", long_about = None)]
struct Cli {
    /// CSV of monthly per-airport delay statistics
    #[arg(short, long, env = "AIRLINE_DELAYS_INPUT", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory for PNG charts
    #[arg(long, env = "AIRLINE_DELAYS_VIS_DIR", default_value = DEFAULT_VISUALIZATIONS_DIR)]
    visualizations_dir: PathBuf,

    /// Directory for the dashboard CSV exports
    #[arg(short, long, env = "AIRLINE_DELAYS_EXPORT_DIR", default_value = DEFAULT_EXPORT_DIR)]
    export_dir: PathBuf,

    /// Only read the first N data rows
    #[arg(short = 'n', long)]
    sample_size: Option<usize>,

    /// Number of airports in the top-airports export and chart
    #[arg(long, default_value_t = DEFAULT_TOP_AIRPORTS)]
    top_airports: usize,

    /// Chart width in pixels
    #[arg(long, default_value_t = 1200)]
    chart_width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = 700)]
    chart_height: u32,

    /// TrueType font for chart text (system fonts are tried otherwise)
    #[arg(long, env = "AIRLINE_DELAYS_CHART_FONT")]
    chart_font: Option<PathBuf>,

    /// Write the CSV exports only
    #[arg(long, default_value_t = false)]
    skip_charts: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    json_summary: bool,
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        PipelineConfig {
            input: cli.input,
            visualizations_dir: cli.visualizations_dir,
            export_dir: cli.export_dir,
            sample_size: cli.sample_size,
            top_airports: cli.top_airports,
            chart_width: cli.chart_width,
            chart_height: cli.chart_height,
            chart_font: cli.chart_font,
            skip_charts: cli.skip_charts,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();
    let json_summary = cli.json_summary;
    let config = PipelineConfig::from(cli);
    print_json(&config)?;

    let mut pipeline = Pipeline::new(config);
    let summary = pipeline
        .run()
        .with_context(|| format!("failed to load {}", pipeline.config().input.display()))?;

    for skipped in &summary.charts_skipped {
        warn!(chart = %skipped.chart, reason = %skipped.reason, "Skipped chart");
    }
    for failed in &summary.export_failures {
        warn!(path = %failed.path.display(), reason = %failed.reason, "Failed export");
    }
    info!(
        rows_processed = summary.rows_processed,
        rows_excluded = summary.rows_excluded,
        charts_produced = summary.charts_produced.len(),
        charts_skipped = summary.charts_skipped.len(),
        files_exported = summary.files_exported.len(),
        "Run summary"
    );

    if json_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/airline_delays.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("airline_delays.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
