//! Churn feature table builder.
//!
//! Reads an exported trips CSV, runs the feature pipeline and writes every
//! output table as CSV. The run report is printed to stdout as JSON.
//!
//! Usage: `cargo run --features cli --bin build_features -- TRIPS.csv --out DIR [OPTIONS]`
//! Example: `cargo run --features cli --bin build_features -- nyc_taxi_data.csv --out features --window-days 7`

use std::path::PathBuf;
use std::process;

use churnfeat::{
    observability::{init_logging, log_app_start, logging_config_from_env},
    pipeline::{
        DuplicatePolicy, FeaturePipeline, GapPolicy, LabelPolicy, LocationAnchor,
        PipelineConfig, TargetSpec, WindowSpec,
    },
    utils::FrameSource,
    write_output,
};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "build_features")]
#[command(about = "Build point-in-time churn features from a trips table", long_about = None)]
#[command(version)]
struct Cli {
    /// Trips CSV file
    input: PathBuf,

    /// Output directory for the CSV tables
    #[arg(long, default_value = "features")]
    out: PathBuf,

    /// JSON pipeline configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trailing window in calendar days
    #[arg(long, conflicts_with = "window_rows")]
    window_days: Option<u32>,

    /// Trailing window in preceding rows (needs gap-free daily series)
    #[arg(long)]
    window_rows: Option<usize>,

    /// Count days without events as zero inside a day window
    #[arg(long)]
    zero_fill: bool,

    /// Decimal places kept when rounding coordinates into entity keys
    #[arg(long)]
    precision: Option<u32>,

    /// Key entities by dropoff instead of pickup location
    #[arg(long)]
    dropoff: bool,

    /// Offset from UTC, in minutes, at which calendar days start
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Label policy
    #[arg(long, value_enum)]
    labels: Option<PolicyArg>,

    /// Target function
    #[arg(long, value_enum)]
    target: Option<TargetArg>,

    /// Outcome window length in days
    #[arg(long)]
    horizon_days: Option<u32>,

    /// Keep the first of duplicate feature rows instead of failing
    #[arg(long)]
    first_wins: bool,

    /// Treat as-of matches older than this many days as absent
    #[arg(long)]
    max_staleness_days: Option<u32>,

    /// Skip the daily trip trend table
    #[arg(long)]
    no_trend: bool,

    /// Run every stage on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Rows per scanned batch
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Dense,
    Sparse,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    Zero,
    Inactivity,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(width) = self.window_days {
            config.window.spec = WindowSpec::Days { width };
        }
        if let Some(preceding) = self.window_rows {
            config.window.spec = WindowSpec::Rows { preceding };
        }
        if self.zero_fill {
            config.window.gap_policy = GapPolicy::ZeroFill;
        }
        if let Some(precision) = self.precision {
            config.entity_key.precision = precision;
        }
        if self.dropoff {
            config.entity_key.anchor = LocationAnchor::Dropoff;
        }
        if let Some(minutes) = self.utc_offset_minutes {
            config.day.utc_offset_minutes = minutes;
        }
        if let Some(policy) = self.labels {
            config.labels.policy = match policy {
                PolicyArg::Dense => LabelPolicy::Dense,
                PolicyArg::Sparse => LabelPolicy::Sparse,
            };
        }
        if let Some(target) = self.target {
            config.labels.target = match target {
                TargetArg::Zero => TargetSpec::Constant { value: 0.0 },
                TargetArg::Inactivity => TargetSpec::Inactivity,
            };
        }
        if let Some(horizon) = self.horizon_days {
            config.labels.horizon_days = horizon;
        }
        if self.first_wins {
            config.join.duplicates = DuplicatePolicy::FirstWins;
        }
        if self.max_staleness_days.is_some() {
            config.join.max_staleness_days = self.max_staleness_days;
        }
        if self.no_trend {
            config.trend.enabled = false;
        }
        if self.sequential {
            config.parallel = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let logging = logging_config_from_env();
    if let Err(e) = init_logging(&logging) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    log_app_start("build_features", &logging);

    if let Err(e) = run() {
        error!(error = %e, "build_features failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.pipeline_config()?;

    let mut source = FrameSource::from_csv(&cli.input)?;
    if let Some(batch_size) = cli.batch_size {
        source = source.with_batch_size(batch_size);
    }

    let output = FeaturePipeline::new(config)?.run(&source)?;
    let written = write_output(&output, &cli.out)?;
    info!(tables = written.len(), out = %cli.out.display(), "wrote feature tables");

    println!("{}", serde_json::to_string_pretty(&output.report)?);
    Ok(())
}
