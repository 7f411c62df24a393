//! Report file writer.
//!
//! Serializes [`Aggregates`] into the files the dashboard loads. Every file
//! is pretty-printed and fully overwritten.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;
use york_report_incident_models::MapIncident;
use york_report_pipeline_models::MapFormat;

use crate::PipelineError;
use crate::aggregate::Aggregates;

/// Municipality counts for the monthly window, highest first.
pub const MONTHLY_SUMMARY_FILE: &str = "monthly_summary.json";

/// Monthly and yearly totals (rolling windows only).
pub const TOTALS_FILE: &str = "york_totals.json";

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), PipelineError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| PipelineError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Writes `value` as pretty-printed JSON, replacing any existing file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let io_error = |e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_error)?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Converts a map incident into a `Point` feature. Coordinates are
/// `[longitude, latitude]`.
fn to_feature(incident: &MapIncident) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("fsa".to_string(), JsonValue::from(incident.fsa.as_str()));
    properties.insert(
        "municipality".to_string(),
        JsonValue::from(incident.municipality.as_str()),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            incident.lon,
            incident.lat,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Builds the `FeatureCollection` written to `map_data.geojson`.
#[must_use]
pub fn feature_collection(incidents: &[MapIncident]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: incidents.iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

/// Writes every report file into `output_dir`, creating it if needed.
///
/// Returns the number of files written.
///
/// # Errors
///
/// Returns [`PipelineError`] if the directory cannot be created or a file
/// cannot be written.
pub fn write_outputs(
    aggregates: &Aggregates,
    output_dir: &Path,
    map_format: MapFormat,
    write_totals: bool,
) -> Result<u64, PipelineError> {
    ensure_dir(output_dir)?;
    let mut written: u64 = 0;

    for (area, records) in &aggregates.areas {
        write_json(&output_dir.join(format!("{area}.json")), records)?;
        written += 1;
    }
    log::info!("Wrote {written} FSA files");

    write_json(
        &output_dir.join(MONTHLY_SUMMARY_FILE),
        &aggregates.monthly.sorted_by_count_desc(),
    )?;
    written += 1;

    if write_totals {
        write_json(&output_dir.join(TOTALS_FILE), &aggregates.totals())?;
        written += 1;
    }

    let map_path = output_dir.join(map_format.file_name());
    match map_format {
        MapFormat::GeoJson => {
            write_json(&map_path, &feature_collection(&aggregates.map_incidents))?;
        }
        MapFormat::Points => write_json(&map_path, &aggregates.map_incidents)?,
    }
    written += 1;
    log::info!(
        "Wrote {} map incidents to {}",
        aggregates.map_incidents.len(),
        map_path.display()
    );

    Ok(written)
}
