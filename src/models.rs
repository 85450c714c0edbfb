use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of a viewing-history export before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Date", alias = "date", alias = "timestamp")]
    pub timestamp: String,
    #[serde(rename = "Title", alias = "title")]
    pub title: String,
}

impl RawRecord {
    pub fn new(timestamp: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewingEvent {
    pub date: NaiveDate,
    pub show_name: String,
    pub season: Option<String>,
    pub episode: Option<String>,
}

/// Calendar features of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarFields {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u8,
    /// ISO week-numbering year, which differs from the calendar year for
    /// some days around New Year.
    pub iso_year: i32,
    pub week_number: u32,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEvent {
    pub date: NaiveDate,
    pub show_name: String,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub weekday: u8,
    pub iso_year: i32,
    pub week_number: u32,
    pub is_weekend: bool,
    pub is_period: bool,
}

impl ClassifiedEvent {
    pub fn new(event: ViewingEvent, calendar: CalendarFields, is_period: bool) -> Self {
        Self {
            date: event.date,
            show_name: event.show_name,
            season: event.season,
            episode: event.episode,
            weekday: calendar.weekday,
            iso_year: calendar.iso_year,
            week_number: calendar.week_number,
            is_weekend: calendar.is_weekend,
            is_period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_views: usize,
    pub unique_shows: usize,
    pub is_period: bool,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyAggregate {
    pub year: i32,
    pub week_number: u32,
    pub total_views: usize,
}

/// A `(is_period, dimension_value) -> count` cell, used for both the
/// weekday and the weekend breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoricalAggregate {
    pub is_period: bool,
    pub dimension_value: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub is_period: bool,
    pub total_views: usize,
    pub unique_shows: usize,
    pub unique_days: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BingeFlag {
    pub date: NaiveDate,
    pub show_name: String,
    pub episode_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BingeRatio {
    pub is_period: bool,
    pub binge_views: usize,
    pub total_views: usize,
    pub ratio: f64,
}
