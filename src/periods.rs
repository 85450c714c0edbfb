//! Classification of days against the configured high-load intervals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::features::derive_calendar_fields;
use crate::models::{ClassifiedEvent, ViewingEvent};

/// A closed date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct PeriodInterval {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct IntervalBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<IntervalBounds> for PeriodInterval {
    type Error = ConfigError;

    fn try_from(bounds: IntervalBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl PeriodInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvertedInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Returns true if `date` lies in any of `intervals`.
///
/// Intervals may overlap and need not be sorted; the scan stops at the first
/// containing interval.
pub fn classify(date: NaiveDate, intervals: &[PeriodInterval]) -> bool {
    intervals.iter().any(|interval| interval.contains(date))
}

/// An owned set of period intervals, supplied once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodSet {
    intervals: Vec<PeriodInterval>,
}

impl PeriodSet {
    pub fn new(intervals: Vec<PeriodInterval>) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> &[PeriodInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn classify(&self, date: NaiveDate) -> bool {
        classify(date, &self.intervals)
    }

    /// Counts calendar days of `first..=last` as `[outside, inside]`.
    ///
    /// Returns `[0, 0]` when `first > last`.
    pub fn days_in(&self, first: NaiveDate, last: NaiveDate) -> [u64; 2] {
        let mut counts = [0, 0];
        if first > last {
            return counts;
        }
        for day in first.iter_days().take_while(|day| *day <= last) {
            counts[usize::from(self.classify(day))] += 1;
        }
        counts
    }
}

impl FromIterator<PeriodInterval> for PeriodSet {
    fn from_iter<I: IntoIterator<Item = PeriodInterval>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Attaches calendar features and the period flag to each event.
pub fn classify_events<I>(events: I, periods: &PeriodSet) -> Vec<ClassifiedEvent>
where
    I: IntoIterator<Item = ViewingEvent>,
{
    events
        .into_iter()
        .map(|event| {
            let calendar = derive_calendar_fields(event.date);
            let is_period = periods.classify(event.date);
            ClassifiedEvent::new(event, calendar, is_period)
        })
        .collect()
}
