//! Row validation and in-memory accumulation.
//!
//! [`Aggregator`] takes rows one at a time in CSV order, drops the ones that
//! cannot be reported, normalizes the date cell of the rest, and builds every
//! structure the output writer needs.

use york_report_incident_models::{
    AreaGroups, IncidentRecord, MapIncident, MunicipalityCounts, Totals, WindowTag, WindowTags,
};
use york_report_pipeline_models::{CoordinateErrorPolicy, RunSummary};

use crate::columns::ResolvedColumns;
use crate::parsing::{format_occurrence_date, parse_coordinate, parse_occurrence_date};
use crate::window::WindowClassifier;

/// Area value some exports use for incidents without an FSA.
const NOT_AVAILABLE: &str = "N/A";

/// A map-window row has a latitude or longitude that is not a number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Row {row}: could not parse {column} '{value}' as a number")]
pub struct CoordinateParseError {
    /// 1-based data row number.
    pub row: u64,
    /// Which coordinate failed (`latitude` or `longitude`).
    pub column: &'static str,
    /// The offending cell.
    pub value: String,
}

/// What happened to a single row. Rejections carry the 1-based data row
/// number the warning was logged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Stored in its area group, tagged with the windows it fell into.
    Accepted(WindowTags),
    /// Empty or `N/A` area, empty date, or empty municipality.
    MissingField { row: u64 },
    /// Date matched no accepted format.
    BadDate { row: u64 },
    /// Area code cannot be used as an output file name.
    BadAreaCode { row: u64 },
    /// Map-window row with an unparseable coordinate.
    BadCoordinates { row: u64 },
}

/// Everything accumulated from one input file.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    /// Accepted rows grouped by area code.
    pub areas: AreaGroups,
    /// Municipality tallies for the monthly (map) window.
    pub monthly: MunicipalityCounts,
    /// Municipality tallies for the yearly window.
    pub yearly: MunicipalityCounts,
    /// Map points, in CSV order.
    pub map_incidents: Vec<MapIncident>,
    /// Every rejected row, in CSV order.
    pub rejected: Vec<RowOutcome>,
    /// Row counters.
    pub summary: RunSummary,
}

impl Aggregates {
    /// Window totals derived from the municipality tallies.
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            monthly: self.monthly.total(),
            yearly: self.yearly.total(),
        }
    }
}

/// Whether `area` can name a file directly inside the output directory.
fn is_file_stem(area: &str) -> bool {
    !area.is_empty()
        && area != "."
        && area != ".."
        && !area.contains(['/', '\\', '\0'])
}

fn trimmed_cell(record: &IncidentRecord, index: usize) -> String {
    record.value(index).unwrap_or_default().trim().to_string()
}

/// Single-pass accumulator over incident rows.
pub struct Aggregator<'a, W: WindowClassifier> {
    columns: ResolvedColumns,
    window: &'a W,
    coordinate_errors: CoordinateErrorPolicy,
    aggregates: Aggregates,
}

impl<'a, W: WindowClassifier> Aggregator<'a, W> {
    #[must_use]
    pub fn new(
        columns: ResolvedColumns,
        window: &'a W,
        coordinate_errors: CoordinateErrorPolicy,
    ) -> Self {
        Self {
            columns,
            window,
            coordinate_errors,
            aggregates: Aggregates::default(),
        }
    }

    /// Validates and accumulates the next row.
    ///
    /// Rows are numbered from 1 in the order they are pushed.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateParseError`] if a map-window row has an
    /// unparseable coordinate and the policy is
    /// [`CoordinateErrorPolicy::Abort`].
    pub fn push(
        &mut self,
        mut record: IncidentRecord,
    ) -> Result<RowOutcome, CoordinateParseError> {
        let summary = &mut self.aggregates.summary;
        summary.rows_read += 1;
        let row = summary.rows_read;

        let area = trimmed_cell(&record, self.columns.area);
        let date_str = trimmed_cell(&record, self.columns.date);
        let municipality = trimmed_cell(&record, self.columns.municipality);

        if area.is_empty()
            || area == NOT_AVAILABLE
            || date_str.is_empty()
            || municipality.is_empty()
        {
            summary.skipped_missing_fields += 1;
            return Ok(self.reject(RowOutcome::MissingField { row }));
        }

        let Some(occurred_at) = parse_occurrence_date(&date_str) else {
            log::warn!("Row {row}: could not parse date '{date_str}', skipping");
            summary.skipped_bad_dates += 1;
            return Ok(self.reject(RowOutcome::BadDate { row }));
        };

        if !is_file_stem(&area) {
            log::warn!("Row {row}: area code '{area}' cannot name an output file, skipping");
            summary.skipped_bad_area_codes += 1;
            return Ok(self.reject(RowOutcome::BadAreaCode { row }));
        }

        let tags = self.window.classify(occurred_at);

        let map_incident = if tags.contains(WindowTag::Monthly) {
            match self.project(row, &record, &area, &municipality) {
                Ok(incident) => Some(incident),
                Err(e) => match self.coordinate_errors {
                    CoordinateErrorPolicy::Abort => return Err(e),
                    CoordinateErrorPolicy::Skip => {
                        log::warn!("{e}, skipping");
                        self.aggregates.summary.skipped_bad_coordinates += 1;
                        return Ok(self.reject(RowOutcome::BadCoordinates { row: e.row }));
                    }
                },
            }
        } else {
            None
        };

        if let Some(incident) = map_incident {
            self.aggregates.monthly.increment(&municipality);
            self.aggregates.map_incidents.push(incident);
        }
        if tags.contains(WindowTag::Yearly) {
            self.aggregates.yearly.increment(&municipality);
        }

        record.set_value(self.columns.date, format_occurrence_date(occurred_at));
        self.aggregates.areas.entry(area).or_default().push(record);
        self.aggregates.summary.processed += 1;

        Ok(RowOutcome::Accepted(tags))
    }

    fn reject(&mut self, outcome: RowOutcome) -> RowOutcome {
        self.aggregates.rejected.push(outcome);
        outcome
    }

    fn project(
        &self,
        row: u64,
        record: &IncidentRecord,
        area: &str,
        municipality: &str,
    ) -> Result<MapIncident, CoordinateParseError> {
        let coordinate = |index: usize, column: &'static str| {
            let raw = record.value(index).unwrap_or_default();
            parse_coordinate(raw).ok_or_else(|| CoordinateParseError {
                row,
                column,
                value: raw.to_string(),
            })
        };

        Ok(MapIncident {
            lat: coordinate(self.columns.latitude, "latitude")?,
            lon: coordinate(self.columns.longitude, "longitude")?,
            fsa: area.to_string(),
            municipality: municipality.to_string(),
        })
    }

    /// Consumes the aggregator.
    #[must_use]
    pub fn finish(mut self) -> Aggregates {
        self.aggregates.summary.areas = self.aggregates.areas.len() as u64;
        self.aggregates
    }
}
