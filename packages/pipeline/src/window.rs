//! Time-window classification.
//!
//! Every policy answers one question per incident: which reporting windows
//! does this timestamp fall into? [`Window`] resolves a configured
//! [`WindowPolicy`] against the run's start time once, then classifies every
//! row against the same cutoffs.

use chrono::{Datelike as _, NaiveDateTime, TimeDelta};
use york_report_incident_models::{WindowTag, WindowTags};
use york_report_pipeline_models::WindowPolicy;

/// Classifies an occurrence timestamp into reporting windows.
pub trait WindowClassifier {
    /// Returns the windows `occurred_at` falls into.
    fn classify(&self, occurred_at: NaiveDateTime) -> WindowTags;
}

/// Windows covering the last N days before a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    monthly_since: NaiveDateTime,
    yearly_since: NaiveDateTime,
}

/// `now` minus `days`, clamped to the earliest representable instant.
fn days_before(now: NaiveDateTime, days: u32) -> NaiveDateTime {
    TimeDelta::try_days(i64::from(days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(NaiveDateTime::MIN)
}

impl RollingWindow {
    #[must_use]
    pub fn new(now: NaiveDateTime, monthly_days: u32, yearly_days: u32) -> Self {
        Self {
            monthly_since: days_before(now, monthly_days),
            yearly_since: days_before(now, yearly_days),
        }
    }
}

impl WindowClassifier for RollingWindow {
    fn classify(&self, occurred_at: NaiveDateTime) -> WindowTags {
        let mut tags = WindowTags::NONE;
        if occurred_at >= self.monthly_since {
            tags = tags.with(WindowTag::Monthly);
        }
        if occurred_at >= self.yearly_since {
            tags = tags.with(WindowTag::Yearly);
        }
        tags
    }
}

/// A single calendar month. Matching incidents land in the monthly window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMonthWindow {
    year: i32,
    month: u32,
}

impl FixedMonthWindow {
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl WindowClassifier for FixedMonthWindow {
    fn classify(&self, occurred_at: NaiveDateTime) -> WindowTags {
        if occurred_at.year() == self.year && occurred_at.month() == self.month {
            WindowTags::NONE.with(WindowTag::Monthly)
        } else {
            WindowTags::NONE
        }
    }
}

/// A [`WindowPolicy`] resolved against the run's start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Rolling(RollingWindow),
    FixedMonth(FixedMonthWindow),
}

impl Window {
    /// Resolves `policy`. `now` is only read by rolling policies.
    #[must_use]
    pub fn from_policy(policy: &WindowPolicy, now: NaiveDateTime) -> Self {
        match *policy {
            WindowPolicy::Rolling {
                monthly_days,
                yearly_days,
            } => Self::Rolling(RollingWindow::new(now, monthly_days, yearly_days)),
            WindowPolicy::FixedMonth { year, month } => {
                Self::FixedMonth(FixedMonthWindow::new(year, month))
            }
        }
    }
}

impl WindowClassifier for Window {
    fn classify(&self, occurred_at: NaiveDateTime) -> WindowTags {
        match self {
            Self::Rolling(window) => window.classify(occurred_at),
            Self::FixedMonth(window) => window.classify(occurred_at),
        }
    }
}
