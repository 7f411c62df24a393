#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Break-in report pipeline.
//!
//! Reads a CSV export of incidents, resolves the required columns, validates
//! and normalizes each row, classifies it against the configured reporting
//! window, and writes the dashboard files:
//!
//! * `<fsa>.json` for every forward sortation area,
//! * `monthly_summary.json` with municipality counts, highest first,
//! * `york_totals.json` with monthly and yearly totals (rolling windows),
//! * `map_data.geojson` or `map_data.json` with the map points.
//!
//! The whole file is aggregated in memory before anything is written, so a
//! run either writes every file or none of them.

pub mod aggregate;
pub mod columns;
pub mod ingest;
pub mod output;
pub mod parsing;
pub mod window;

use chrono::{Local, NaiveDateTime};
use york_report_incident_models::WindowTag;
use york_report_pipeline_models::{ConfigError, PipelineConfig, RunSummary};

use crate::aggregate::CoordinateParseError;
use crate::columns::MissingColumnError;
use crate::window::Window;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input CSV does not exist.
    #[error("The file was not found at {path}")]
    InputNotFound {
        /// Path that was opened.
        path: String,
    },

    /// A required column is absent from the header row.
    #[error(transparent)]
    MissingColumns(#[from] MissingColumnError),

    /// A map-window coordinate could not be parsed under the abort policy.
    #[error(transparent)]
    Coordinate(#[from] CoordinateParseError),

    /// The CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File or directory I/O failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs the pipeline with rolling windows ending at the current local time.
///
/// # Errors
///
/// Returns [`PipelineError`] if the config is invalid, the input cannot be
/// read, or an output file cannot be written.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    run_at(config, Local::now().naive_local())
}

/// Runs the pipeline with `now` as the reference instant for rolling
/// windows.
///
/// # Errors
///
/// Returns [`PipelineError`] if the config is invalid, the input cannot be
/// read, or an output file cannot be written.
pub fn run_at(config: &PipelineConfig, now: NaiveDateTime) -> Result<RunSummary, PipelineError> {
    config.validate()?;

    let window = Window::from_policy(&config.window, now);
    let aggregates = ingest::read_incidents_file(&config.input_path, config, &window)?;

    let summary = &aggregates.summary;
    log::info!("Read {} total rows from CSV.", summary.rows_read);
    log::info!(
        "Successfully processed {} rows with valid data.",
        summary.processed
    );
    if summary.skipped_bad_dates > 0 || summary.skipped_bad_coordinates > 0 {
        log::info!(
            "Skipped {} rows with unparseable dates and {} with unparseable coordinates.",
            summary.skipped_bad_dates,
            summary.skipped_bad_coordinates
        );
    }
    if !aggregates.rejected.is_empty() {
        log::debug!("Rejected rows: {:?}", aggregates.rejected);
    }
    let totals = aggregates.totals();
    log::info!("{} incidents in the {} window.", totals.monthly, WindowTag::Monthly);
    if config.window.has_yearly_window() {
        log::info!("{} incidents in the {} window.", totals.yearly, WindowTag::Yearly);
    }
    log::info!(
        "Found {} unique FSAs. Writing JSON files...",
        aggregates.areas.len()
    );

    let files_written = output::write_outputs(
        &aggregates,
        &config.output_dir,
        config.map_format(),
        config.window.has_yearly_window(),
    )?;

    log::info!(
        "Successfully created {files_written} files in '{}'",
        config.output_dir.display()
    );

    Ok(RunSummary {
        files_written,
        ..aggregates.summary
    })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use york_report_pipeline_models::{CoordinateErrorPolicy, MapFormat, WindowPolicy};

    use super::*;
    use crate::parsing::parse_occurrence_date;

    const HEADER: &str = "OBJECTID,occurrence_date,FSA,Municipality,Latitude,Longitude,Premises\n";

    /// Fresh scratch directory holding `input.csv` with `rows` after the
    /// header.
    fn setup(name: &str, rows: &str) -> (PathBuf, PipelineConfig) {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("input.csv");
        std::fs::write(&input, format!("{HEADER}{rows}")).unwrap();
        let config = PipelineConfig {
            input_path: input,
            output_dir: dir.join("data"),
            ..PipelineConfig::default()
        };
        (dir, config)
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&read(path)).unwrap()
    }

    fn august_2025(config: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            window: WindowPolicy::FixedMonth {
                year: 2025,
                month: 8,
            },
            ..config
        }
    }

    fn now() -> NaiveDateTime {
        parse_occurrence_date("2025-09-30 12:00:00").unwrap()
    }

    #[test]
    fn fixed_month_scenario_writes_area_summary_and_points() {
        let (dir, config) = setup(
            "york_report_fixed_month",
            "1,2025-08-15 10:00:00,L4J,Vaughan,43.8,-79.5,House\n",
        );
        let config = august_2025(config);

        let summary = run_at(&config, now()).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.files_written, 3);

        let out = &config.output_dir;
        assert_eq!(
            read_json(&out.join("L4J.json")),
            serde_json::json!([{
                "OBJECTID": "1",
                "occurrence_date": "2025-08-15 10:00:00",
                "FSA": "L4J",
                "Municipality": "Vaughan",
                "Latitude": "43.8",
                "Longitude": "-79.5",
                "Premises": "House",
            }])
        );
        assert_eq!(
            read_json(&out.join("monthly_summary.json")),
            serde_json::json!({"Vaughan": 1})
        );
        assert_eq!(
            read_json(&out.join("map_data.json")),
            serde_json::json!([{"lat": 43.8, "lon": -79.5, "fsa": "L4J", "municipality": "Vaughan"}])
        );
        assert!(!out.join("york_totals.json").exists());
        assert!(!out.join("map_data.geojson").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn repeated_header_is_written_once_with_its_last_value() {
        let (dir, config) = setup("york_report_repeated_header", "");
        std::fs::write(
            &config.input_path,
            "fsa,occurrence_date,municipality,latitude,longitude,note,note\n\
             L4J,2025-08-15 10:00:00,Vaughan,43.8,-79.5,a,b\n",
        )
        .unwrap();
        let config = august_2025(config);

        run_at(&config, now()).unwrap();

        let text = read(&config.output_dir.join("L4J.json"));
        assert_eq!(text.matches("\"note\"").count(), 1);
        assert_eq!(read_json(&config.output_dir.join("L4J.json"))[0]["note"], "b");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn us_date_format_produces_identical_output() {
        let (dir_a, config_a) = setup(
            "york_report_same_output_a",
            "1,2025-08-15 10:00:00,L4J,Vaughan,43.8,-79.5,House\n",
        );
        let (dir_b, config_b) = setup(
            "york_report_same_output_b",
            "1,08/15/2025 10:00:00 AM,L4J,Vaughan,43.8,-79.5,House\n",
        );
        let config_a = august_2025(config_a);
        let config_b = august_2025(config_b);
        run_at(&config_a, now()).unwrap();
        run_at(&config_b, now()).unwrap();

        for file in ["L4J.json", "monthly_summary.json", "map_data.json"] {
            assert_eq!(
                read(&config_a.output_dir.join(file)),
                read(&config_b.output_dir.join(file)),
                "{file} differs"
            );
        }

        let _ = std::fs::remove_dir_all(&dir_a);
        let _ = std::fs::remove_dir_all(&dir_b);
    }

    #[test]
    fn invalid_rows_are_excluded_and_the_run_continues() {
        let (dir, config) = setup(
            "york_report_invalid_rows",
            "1,not-a-date,L4J,Vaughan,43.8,-79.5,House\n\
             2,2025-08-15 10:00:00,,Vaughan,43.8,-79.5,House\n\
             3,2025-08-15 10:00:00,N/A,Vaughan,43.8,-79.5,House\n\
             4,2025-08-15 10:00:00,L6A,,43.8,-79.5,House\n\
             5,2025-08-16 11:00:00,L6A,Vaughan,43.9,-79.6,Apartment\n",
        );
        let config = august_2025(config);

        let summary = run_at(&config, now()).unwrap();
        assert_eq!(summary.rows_read, 5);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped_bad_dates, 1);
        assert_eq!(summary.skipped_missing_fields, 3);
        assert_eq!(summary.areas, 1);

        let out = &config.output_dir;
        assert!(!out.join("L4J.json").exists());
        assert!(!out.join("N/A.json").exists());
        let l6a = read_json(&out.join("L6A.json"));
        assert_eq!(l6a.as_array().unwrap().len(), 1);
        assert_eq!(l6a[0]["OBJECTID"], "5");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rolling_run_writes_totals_and_geojson() {
        let (dir, config) = setup(
            "york_report_rolling",
            "1,2025-09-20 10:00:00,L4J,Vaughan,43.8,-79.5,House\n\
             2,2025-09-21 10:00:00,L3R,Markham,43.85,-79.3,House\n\
             3,2025-09-22 10:00:00,L4J,Vaughan,43.81,-79.51,House\n\
             4,2025-03-01 10:00:00,L3R,Markham,43.86,-79.31,House\n\
             5,2021-03-01 10:00:00,L3R,Markham,43.86,-79.31,House\n",
        );

        let summary = run_at(&config, now()).unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.files_written, 5);

        let out = &config.output_dir;
        let monthly = read(&out.join("monthly_summary.json"));
        assert_eq!(monthly, "{\n  \"Vaughan\": 2,\n  \"Markham\": 1\n}");

        let totals = read_json(&out.join("york_totals.json"));
        assert_eq!(totals, serde_json::json!({"monthly": 3, "yearly": 4}));

        let geojson = read_json(&out.join("map_data.geojson"));
        assert_eq!(geojson["type"], "FeatureCollection");
        let features = geojson["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            serde_json::json!([-79.5, 43.8])
        );
        assert_eq!(features[1]["properties"]["municipality"], "Markham");

        assert_eq!(
            read_json(&out.join("L3R.json")).as_array().unwrap().len(),
            3
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn summary_ties_keep_encounter_order() {
        let (dir, config) = setup(
            "york_report_ties",
            "1,2025-08-01 10:00:00,L4B,Richmond Hill,43.8,-79.4,House\n\
             2,2025-08-02 10:00:00,L3R,Markham,43.8,-79.3,House\n\
             3,2025-08-03 10:00:00,L3R,Markham,43.8,-79.3,House\n\
             4,2025-08-04 10:00:00,L6A,Vaughan,43.8,-79.5,House\n",
        );
        let config = august_2025(config);
        run_at(&config, now()).unwrap();

        let monthly = read(&config.output_dir.join("monthly_summary.json"));
        assert_eq!(
            monthly,
            "{\n  \"Markham\": 2,\n  \"Richmond Hill\": 1,\n  \"Vaughan\": 1\n}"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn map_format_override_applies() {
        let (dir, config) = setup(
            "york_report_override",
            "1,2025-08-15 10:00:00,L4J,Vaughan,43.8,-79.5,House\n",
        );
        let config = PipelineConfig {
            map_format: Some(MapFormat::GeoJson),
            ..august_2025(config)
        };
        run_at(&config, now()).unwrap();
        assert!(config.output_dir.join("map_data.geojson").exists());
        assert!(!config.output_dir.join("map_data.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn coordinate_abort_writes_nothing() {
        let (dir, config) = setup(
            "york_report_coordinate_abort",
            "1,2025-08-15 10:00:00,L4J,Vaughan,43.8,-79.5,House\n\
             2,2025-08-16 10:00:00,L4J,Vaughan,,-79.5,House\n",
        );
        let config = PipelineConfig {
            coordinate_errors: CoordinateErrorPolicy::Abort,
            ..august_2025(config)
        };
        let err = run_at(&config, now()).unwrap_err();
        assert!(matches!(err, PipelineError::Coordinate(_)));
        assert!(!config.output_dir.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_input_writes_nothing() {
        let dir = std::env::temp_dir().join("york_report_missing_input");
        let _ = std::fs::remove_dir_all(&dir);
        let config = PipelineConfig {
            input_path: dir.join("absent.csv"),
            output_dir: dir.join("data"),
            ..PipelineConfig::default()
        };
        let err = run_at(&config, now()).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound { .. }));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn invalid_config_is_rejected_before_reading() {
        let config = PipelineConfig {
            window: WindowPolicy::FixedMonth {
                year: 2025,
                month: 0,
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            run_at(&config, now()),
            Err(PipelineError::Config(ConfigError::InvalidMonth { month: 0 }))
        ));
    }

    #[test]
    fn per_area_rows_sum_to_processed() {
        let (dir, config) = setup(
            "york_report_row_sum",
            "1,2025-08-15 10:00:00,L4J,Vaughan,43.8,-79.5,House\n\
             2,2024-01-15 10:00:00,L3R,Markham,43.8,-79.3,House\n\
             3,01/15/2024 09:00:00 PM,L3R,Markham,43.8,-79.3,House\n\
             4,garbage,L3R,Markham,43.8,-79.3,House\n",
        );
        let config = august_2025(config);
        let summary = run_at(&config, now()).unwrap();

        let total: usize = ["L4J.json", "L3R.json"]
            .iter()
            .map(|f| {
                read_json(&config.output_dir.join(f))
                    .as_array()
                    .unwrap()
                    .len()
            })
            .sum();
        assert_eq!(total as u64, summary.processed);
        assert_eq!(summary.processed, 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
