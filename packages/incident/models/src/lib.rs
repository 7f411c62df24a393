#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types shared by the report pipeline.
//!
//! An [`IncidentRecord`] is one CSV row carried through verbatim (apart from
//! its normalized date cell). [`MapIncident`] is the point projection used by
//! the map, and [`MunicipalityCounts`] is the encounter-ordered tally behind
//! `monthly_summary.json`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::Display;

/// Area code (FSA) to the records observed for it, in CSV row order.
pub type AreaGroups = BTreeMap<String, Vec<IncidentRecord>>;

/// One CSV row with every original column.
///
/// The header row is shared between all records of a file. Serializes as a
/// JSON object in header order; cells missing from a short row serialize as
/// `null`. A repeated header name appears once, at its first position, with
/// the value of its last column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRecord {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl IncidentRecord {
    /// Creates a record from the shared header row and this row's cells.
    ///
    /// Cells beyond the header length are dropped.
    #[must_use]
    pub fn new(headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.truncate(headers.len());
        Self { headers, values }
    }

    /// Returns the cell at `index`, if the row has one.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Returns the cell for an exact header name.
    ///
    /// When the header row repeats a name, the last column with that name
    /// wins. Returns `None` if the row is too short to hold that column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().rposition(|h| h == column)?;
        self.value(index)
    }

    /// Overwrites the cell at `index`. Returns `false` if the row is too
    /// short to hold it.
    pub fn set_value(&mut self, index: usize, value: String) -> bool {
        let Some(cell) = self.values.get_mut(index) else {
            return false;
        };
        *cell = value;
        true
    }

    /// Header names in order, each repeated name kept at its first position.
    fn unique_headers(&self) -> impl Iterator<Item = &str> {
        let headers = &self.headers;
        headers
            .iter()
            .enumerate()
            .filter(move |&(i, h)| !headers[..i].contains(h))
            .map(|(_, h)| h.as_str())
    }
}

impl Serialize for IncidentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.unique_headers().count()))?;
        for header in self.unique_headers() {
            map.serialize_entry(header, &self.get(header))?;
        }
        map.end()
    }
}

/// Point projection of an incident inside the map window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapIncident {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Forward sortation area of the incident.
    pub fsa: String,
    /// Municipality the incident was reported in.
    pub municipality: String,
}

/// Municipality tallies in first-encounter order.
///
/// Keeping encounter order means [`Self::sorted_by_count_desc`] leaves ties
/// in the order they first appeared in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MunicipalityCounts {
    entries: Vec<(String, u64)>,
    index: BTreeMap<String, usize>,
}

impl MunicipalityCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence for `municipality`.
    pub fn increment(&mut self, municipality: &str) {
        if let Some(&i) = self.index.get(municipality)
            && let Some(entry) = self.entries.get_mut(i)
        {
            entry.1 += 1;
            return;
        }
        self.index.insert(municipality.to_owned(), self.entries.len());
        self.entries.push((municipality.to_owned(), 1));
    }

    /// Count for `municipality`, zero if never seen.
    #[must_use]
    pub fn get(&self, municipality: &str) -> u64 {
        self.index
            .get(municipality)
            .and_then(|&i| self.entries.get(i))
            .map_or(0, |(_, count)| *count)
    }

    /// Sum of every count.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Iterates `(municipality, count)` in the current order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Returns a copy ordered by count, highest first. The sort is stable.
    #[must_use]
    pub fn sorted_by_count_desc(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self { entries, index }
    }
}

impl Serialize for MunicipalityCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in self.iter() {
            map.serialize_entry(name, &count)?;
        }
        map.end()
    }
}

/// Region-wide incident totals written to `york_totals.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Incidents inside the monthly window.
    pub monthly: u64,
    /// Incidents inside the yearly window.
    pub yearly: u64,
}

/// A reporting window an incident can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WindowTag {
    /// The short window that drives the summary and the map.
    Monthly,
    /// The long window that only feeds the yearly total.
    Yearly,
}

/// The set of windows a single incident falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowTags {
    monthly: bool,
    yearly: bool,
}

impl WindowTags {
    /// Outside every window.
    pub const NONE: Self = Self {
        monthly: false,
        yearly: false,
    };

    /// Returns these tags with `tag` added.
    #[must_use]
    pub const fn with(self, tag: WindowTag) -> Self {
        match tag {
            WindowTag::Monthly => Self {
                monthly: true,
                ..self
            },
            WindowTag::Yearly => Self {
                yearly: true,
                ..self
            },
        }
    }

    #[must_use]
    pub const fn contains(self, tag: WindowTag) -> bool {
        match tag {
            WindowTag::Monthly => self.monthly,
            WindowTag::Yearly => self.yearly,
        }
    }
}
