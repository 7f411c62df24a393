#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the break-in report generator.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use york_report_pipeline_models::{
    CoordinateErrorPolicy, DEFAULT_MONTHLY_DAYS, DEFAULT_YEARLY_DAYS, MapFormat, PipelineConfig,
    WindowPolicy,
};

#[derive(Parser)]
#[command(
    name = "york_report",
    about = "Build the break-in dashboard files from a CSV export"
)]
struct Cli {
    /// TOML config file. Anything it omits takes its default.
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV file to read
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory to write the report files to
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Map data format: `geojson` or `points`
    #[arg(long, value_parser = parse_map_format)]
    map_format: Option<MapFormat>,
    /// What to do with unparseable coordinates: `skip` or `abort`
    #[arg(long, value_parser = parse_coordinate_errors)]
    coordinate_errors: Option<CoordinateErrorPolicy>,
    #[command(subcommand)]
    window: Option<WindowCommand>,
}

#[derive(Subcommand)]
enum WindowCommand {
    /// Report the windows ending now (writes totals and GeoJSON)
    Rolling {
        /// Days in the monthly window
        #[arg(long, default_value_t = DEFAULT_MONTHLY_DAYS)]
        monthly_days: u32,
        /// Days in the yearly window
        #[arg(long, default_value_t = DEFAULT_YEARLY_DAYS)]
        yearly_days: u32,
    },
    /// Report a single calendar month (writes a plain point list)
    Month {
        /// Calendar year (e.g. 2025)
        #[arg(long)]
        year: i32,
        /// Calendar month, 1-12
        #[arg(long)]
        month: u32,
    },
}

fn parse_map_format(s: &str) -> Result<MapFormat, String> {
    s.parse()
        .map_err(|_| format!("unknown map format '{s}' (expected `geojson` or `points`)"))
}

fn parse_coordinate_errors(s: &str) -> Result<CoordinateErrorPolicy, String> {
    s.parse()
        .map_err(|_| format!("unknown policy '{s}' (expected `skip` or `abort`)"))
}

impl From<WindowCommand> for WindowPolicy {
    fn from(command: WindowCommand) -> Self {
        match command {
            WindowCommand::Rolling {
                monthly_days,
                yearly_days,
            } => Self::Rolling {
                monthly_days,
                yearly_days,
            },
            WindowCommand::Month { year, month } => Self::FixedMonth { year, month },
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(input) = cli.input {
        config.input_path = input;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(map_format) = cli.map_format {
        config.map_format = Some(map_format);
    }
    if let Some(policy) = cli.coordinate_errors {
        config.coordinate_errors = policy;
    }
    if let Some(window) = cli.window {
        config.window = window.into();
    }

    log::debug!("Running with {config:?}");
    let summary = york_report_pipeline::run(&config)?;
    log::info!(
        "Done: {} of {} rows processed, {} FSAs, {} files written",
        summary.processed,
        summary.rows_read,
        summary.areas,
        summary.files_written
    );

    Ok(())
}
