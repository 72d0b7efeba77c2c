//! Year/month filter applied before the hierarchy is built

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dates::declared_start;
use super::models::Plan;

/// Calendar month number, always within 1..=12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarMonth(u32);

impl CalendarMonth {
    /// `None` if `month` is outside 1..=12
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(CalendarMonth(month))
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

/// Month part of a period filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonthFilter {
    #[default]
    All,
    Month(CalendarMonth),
}

impl MonthFilter {
    /// `None` if `month` is outside 1..=12
    pub fn month(month: u32) -> Option<Self> {
        CalendarMonth::new(month).map(MonthFilter::Month)
    }

    fn matches(&self, month: u32) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Month(m) => m.number() == month,
        }
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => write!(f, "all"),
            MonthFilter::Month(m) => write!(f, "{}", m.number()),
        }
    }
}

impl FromStr for MonthFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(MonthFilter::All);
        }
        s.parse::<u32>()
            .ok()
            .and_then(MonthFilter::month)
            .ok_or_else(|| format!("invalid month '{}': expected 1-12 or \"all\"", s))
    }
}

impl Serialize for MonthFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MonthFilter::All => serializer.serialize_str("all"),
            MonthFilter::Month(m) => serializer.serialize_u32(m.number()),
        }
    }
}

impl<'de> Deserialize<'de> for MonthFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(m) => MonthFilter::month(m)
                .ok_or_else(|| serde::de::Error::custom(format!("month out of range: {}", m))),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// An applied `{year, month}` filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub year: i32,
    #[serde(default)]
    pub month: MonthFilter,
}

impl PeriodFilter {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: MonthFilter::All,
        }
    }

    pub fn with_month(mut self, month: MonthFilter) -> Self {
        self.month = month;
        self
    }

    /// Filter covering the current calendar year
    pub fn current_year(now: DateTime<Utc>) -> Self {
        Self::year(now.year())
    }

    pub fn matches(&self, instant: DateTime<Utc>) -> bool {
        instant.year() == self.year && self.month.matches(instant.month())
    }
}

/// Keep plans whose declared start falls in the filter period.
///
/// Plans with neither a parsable `startDate` nor `createdAt` are dropped.
/// Input order is preserved.
pub fn filter_plans(plans: &[Plan], filter: &PeriodFilter) -> Vec<Plan> {
    let kept: Vec<Plan> = plans
        .iter()
        .filter(|plan| declared_start(plan).is_some_and(|start| filter.matches(start)))
        .cloned()
        .collect();
    debug!(
        year = filter.year,
        month = %filter.month,
        input = plans.len(),
        kept = kept.len(),
        "Filtered plans"
    );
    kept
}

// ============================================================================
// Filter form (pending vs. applied)
// ============================================================================

/// Search form state: edits go to `pending` and only reach the pipeline
/// once `apply` is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterForm {
    pending: PeriodFilter,
    applied: PeriodFilter,
}

impl FilterForm {
    pub fn new(initial: PeriodFilter) -> Self {
        Self {
            pending: initial,
            applied: initial,
        }
    }

    pub fn set_year(&mut self, year: i32) {
        self.pending.year = year;
    }

    pub fn set_month(&mut self, month: MonthFilter) {
        self.pending.month = month;
    }

    pub fn pending(&self) -> &PeriodFilter {
        &self.pending
    }

    pub fn applied(&self) -> &PeriodFilter {
        &self.applied
    }

    /// Whether `pending` differs from what is currently applied
    pub fn is_dirty(&self) -> bool {
        self.pending != self.applied
    }

    /// Promote the pending values. Returns `true` if the applied filter changed.
    pub fn apply(&mut self) -> bool {
        let changed = self.is_dirty();
        self.applied = self.pending;
        changed
    }
}
