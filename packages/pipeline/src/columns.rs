//! Header resolution.
//!
//! Maps the five logical column names onto the header row of the CSV by
//! case-insensitive exact match.

use york_report_pipeline_models::ColumnNames;

/// One or more required columns are absent from the header row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Required column(s) not found: {}. Detected headers: {headers:?}",
    .missing.join(", ")
)]
pub struct MissingColumnError {
    /// Logical names that matched no header.
    pub missing: Vec<String>,
    /// The header row as read.
    pub headers: Vec<String>,
}

/// Header indices of the required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: usize,
    pub area: usize,
    pub municipality: usize,
    pub latitude: usize,
    pub longitude: usize,
}

/// Finds the first header equal to `name`, ignoring case.
///
/// If that exact header is repeated, the last column carrying it is the one
/// a record reports, so that index is returned.
fn find_header(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.to_lowercase();
    let first = headers.iter().position(|h| h.to_lowercase() == wanted)?;
    headers.iter().rposition(|h| *h == headers[first])
}

/// Resolves every logical column against `headers`.
///
/// # Errors
///
/// Returns [`MissingColumnError`] listing every unresolved name if any of
/// the five columns is absent.
pub fn resolve_columns(
    headers: &[String],
    names: &ColumnNames,
) -> Result<ResolvedColumns, MissingColumnError> {
    let mut missing = Vec::new();
    let mut lookup = |name: &str| {
        find_header(headers, name).unwrap_or_else(|| {
            missing.push(name.to_string());
            usize::MAX
        })
    };

    let resolved = ResolvedColumns {
        date: lookup(&names.date),
        area: lookup(&names.area),
        municipality: lookup(&names.municipality),
        latitude: lookup(&names.latitude),
        longitude: lookup(&names.longitude),
    };

    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(MissingColumnError {
            missing,
            headers: headers.to_vec(),
        })
    }
}
