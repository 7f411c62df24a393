//! Date and coordinate parsing for incident rows.

use chrono::NaiveDateTime;

/// Canonical timestamp format written back into every stored row.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Twelve-hour US format some exports use (`08/15/2025 10:00:00 AM`).
pub const US_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Accepted occurrence-date formats, tried in order.
const ACCEPTED_DATE_FORMATS: [&str; 2] = [CANONICAL_DATE_FORMAT, US_DATE_FORMAT];

/// Parses an occurrence date in any accepted format.
#[must_use]
pub fn parse_occurrence_date(s: &str) -> Option<NaiveDateTime> {
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Formats a timestamp in [`CANONICAL_DATE_FORMAT`].
#[must_use]
pub fn format_occurrence_date(dt: NaiveDateTime) -> String {
    dt.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Parses a latitude or longitude cell. Surrounding whitespace is allowed;
/// non-finite values are rejected.
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
