//! CSV reading.
//!
//! Reads the whole export through [`Aggregator`] before anything is written,
//! so any failure here leaves the output directory untouched.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use york_report_incident_models::IncidentRecord;
use york_report_pipeline_models::PipelineConfig;

use crate::PipelineError;
use crate::aggregate::{Aggregates, Aggregator};
use crate::columns::resolve_columns;
use crate::window::WindowClassifier;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reads the header row, stripping a leading byte-order mark.
fn read_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>, csv::Error> {
    Ok(reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(BYTE_ORDER_MARK).to_owned()
            } else {
                h.to_owned()
            }
        })
        .collect())
}

/// Reads and aggregates every row of a CSV stream.
///
/// # Errors
///
/// Returns [`PipelineError`] if a required column is missing, the CSV is
/// malformed, or a coordinate fails under the abort policy.
pub fn read_incidents<R: Read, W: WindowClassifier>(
    reader: R,
    config: &PipelineConfig,
    window: &W,
) -> Result<Aggregates, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = read_headers(&mut csv_reader)?;
    let columns = resolve_columns(&headers, &config.columns)?;

    log::info!(
        "Successfully found columns: '{}', '{}', '{}', '{}', '{}'",
        headers[columns.area],
        headers[columns.date],
        headers[columns.municipality],
        headers[columns.latitude],
        headers[columns.longitude],
    );

    let headers: Arc<[String]> = headers.into();
    let mut aggregator = Aggregator::new(columns, window, config.coordinate_errors);

    for result in csv_reader.records() {
        let record = result?;
        let cells = record.iter().map(str::to_owned).collect();
        aggregator.push(IncidentRecord::new(Arc::clone(&headers), cells))?;
    }

    Ok(aggregator.finish())
}

/// Opens `path` and aggregates it with [`read_incidents`].
///
/// # Errors
///
/// Returns [`PipelineError::InputNotFound`] if the file does not exist, or
/// any error [`read_incidents`] returns.
pub fn read_incidents_file<W: WindowClassifier>(
    path: &Path,
    config: &PipelineConfig,
    window: &W,
) -> Result<Aggregates, PipelineError> {
    log::info!("Attempting to read data from {}...", path.display());

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputNotFound {
                path: path.display().to_string(),
            }
        } else {
            PipelineError::Io {
                path: path.display().to_string(),
                source: e,
            }
        }
    })?;

    read_incidents(BufReader::new(file), config, window)
}
