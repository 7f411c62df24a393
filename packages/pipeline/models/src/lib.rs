#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration, window policy, and run summary types.
//!
//! A [`PipelineConfig`] is passed explicitly into every run, so several runs
//! with different settings can share a process. It can be built in code or
//! loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default CSV export read when no input path is configured.
pub const DEFAULT_INPUT_PATH: &str = "York Break-ins 2024_2025.csv";

/// Default directory the report files are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Default length of the rolling monthly window, in days.
pub const DEFAULT_MONTHLY_DAYS: u32 = 30;

/// Default length of the rolling yearly window, in days.
pub const DEFAULT_YEARLY_DAYS: u32 = 365;

/// Errors raised while loading or validating a [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A fixed-month window named a month outside 1-12.
    #[error("Invalid month {month}: expected 1-12")]
    InvalidMonth {
        /// The rejected month.
        month: u32,
    },

    /// A rolling window has inconsistent day counts.
    #[error("Invalid rolling window: {message}")]
    InvalidWindow {
        /// Description of what went wrong.
        message: String,
    },
}

/// Logical column names, matched case-insensitively against the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Occurrence timestamp column.
    pub date: String,
    /// Forward sortation area (postal routing prefix) column.
    pub area: String,
    /// Municipality column.
    pub municipality: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "occurrence_date".to_string(),
            area: "fsa".to_string(),
            municipality: "municipality".to_string(),
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
        }
    }
}

const fn default_monthly_days() -> u32 {
    DEFAULT_MONTHLY_DAYS
}

const fn default_yearly_days() -> u32 {
    DEFAULT_YEARLY_DAYS
}

/// Which incidents count toward the summary, totals, and map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Windows ending at the moment the run starts.
    Rolling {
        /// Days covered by the monthly (map) window.
        #[serde(default = "default_monthly_days")]
        monthly_days: u32,
        /// Days covered by the yearly window.
        #[serde(default = "default_yearly_days")]
        yearly_days: u32,
    },
    /// A single calendar month.
    FixedMonth {
        /// Calendar year.
        year: i32,
        /// Calendar month, 1-12.
        month: u32,
    },
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::Rolling {
            monthly_days: DEFAULT_MONTHLY_DAYS,
            yearly_days: DEFAULT_YEARLY_DAYS,
        }
    }
}

impl WindowPolicy {
    /// Whether this policy tracks a yearly window (and so writes totals).
    #[must_use]
    pub const fn has_yearly_window(&self) -> bool {
        matches!(self, Self::Rolling { .. })
    }

    /// Map format written when the config does not override it.
    #[must_use]
    pub const fn default_map_format(&self) -> MapFormat {
        match self {
            Self::Rolling { .. } => MapFormat::GeoJson,
            Self::FixedMonth { .. } => MapFormat::Points,
        }
    }

    /// Checks the policy's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a fixed month is outside 1-12, or if a
    /// rolling monthly window is empty or longer than the yearly window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Rolling {
                monthly_days,
                yearly_days,
            } => {
                if monthly_days == 0 {
                    return Err(ConfigError::InvalidWindow {
                        message: "monthly_days must be at least 1".to_string(),
                    });
                }
                if monthly_days > yearly_days {
                    return Err(ConfigError::InvalidWindow {
                        message: format!(
                            "monthly_days ({monthly_days}) exceeds yearly_days ({yearly_days})"
                        ),
                    });
                }
                Ok(())
            }
            Self::FixedMonth { month, .. } => {
                if (1..=12).contains(&month) {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidMonth { month })
                }
            }
        }
    }
}

/// Shape of the map data file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum MapFormat {
    /// RFC 7946 `FeatureCollection` of `Point` features.
    #[serde(rename = "geojson")]
    #[strum(serialize = "geojson")]
    GeoJson,
    /// Plain JSON array of `{lat, lon, fsa, municipality}` objects.
    #[serde(rename = "points")]
    #[strum(serialize = "points")]
    Points,
}

impl MapFormat {
    /// File name of the map document inside the output directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::GeoJson => "map_data.geojson",
            Self::Points => "map_data.json",
        }
    }
}

/// What to do when a map-window row has an unparseable coordinate.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinateErrorPolicy {
    /// Warn and drop the row from every output.
    #[default]
    Skip,
    /// Fail the whole run before anything is written.
    Abort,
}

/// Everything a single pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV file to read.
    pub input_path: PathBuf,
    /// Directory the report files are written to.
    pub output_dir: PathBuf,
    /// Logical column names.
    pub columns: ColumnNames,
    /// Window policy.
    pub window: WindowPolicy,
    /// Overrides the policy's default map format.
    pub map_format: Option<MapFormat>,
    /// Handling of unparseable coordinates.
    pub coordinate_errors: CoordinateErrorPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            columns: ColumnNames::default(),
            window: WindowPolicy::default(),
            map_format: None,
            coordinate_errors: CoordinateErrorPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a config from a TOML string. Missing keys take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or the window policy
    /// is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the window policy is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()
    }

    /// The map format this run writes.
    #[must_use]
    pub fn map_format(&self) -> MapFormat {
        self.map_format.unwrap_or_else(|| self.window.default_map_format())
    }
}

/// Counts describing a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Data rows read from the CSV (header excluded).
    pub rows_read: u64,
    /// Rows that passed validation and were written to an area file.
    pub processed: u64,
    /// Rows dropped for an empty or `N/A` area, empty date, or empty
    /// municipality.
    pub skipped_missing_fields: u64,
    /// Rows dropped because the date matched no accepted format.
    pub skipped_bad_dates: u64,
    /// Rows dropped because the area code cannot name an output file.
    pub skipped_bad_area_codes: u64,
    /// Map-window rows dropped for an unparseable coordinate.
    pub skipped_bad_coordinates: u64,
    /// Distinct area codes written.
    pub areas: u64,
    /// Files written to the output directory.
    pub files_written: u64,
}
