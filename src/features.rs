//! Turns raw viewing records into normalized, dated events.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ParseError;
use crate::models::{CalendarFields, RawRecord, ViewingEvent};

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%y";

/// Formats tried after the configured one when parsing leniently.
const LENIENT_FALLBACK_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%d.%m.%Y"];

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateParsing {
    #[default]
    Strict,
    Lenient,
}

/// How raw records are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions<'a> {
    pub date_format: &'a str,
    pub date_parsing: DateParsing,
    /// Events outside this calendar year are filtered out, not rejected.
    pub analysis_year: Option<i32>,
}

impl Default for NormalizeOptions<'_> {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT,
            date_parsing: DateParsing::Strict,
            analysis_year: None,
        }
    }
}

/// Splits a title of the form `Show: Season N: Episode` into its parts.
///
/// The show name is whatever precedes the first `": "`. A `Season N`
/// segment directly after it is taken as the season, and the remainder, if
/// any, is the episode descriptor. Titles without a separator are returned
/// whole as the show name.
pub fn parse_title(title: &str) -> (String, Option<String>, Option<String>) {
    let Some((show, rest)) = title.split_once(SEPARATOR) else {
        return (title.trim().to_string(), None, None);
    };
    let show = show.trim().to_string();

    let (season, episode) = match split_season(rest) {
        Some((season, episode)) => (Some(season.to_string()), episode),
        None => (None, Some(rest)),
    };
    let episode = episode.filter(|e| !e.is_empty()).map(str::to_string);

    (show, season, episode)
}

/// Matches `Season <digits>` optionally followed by `": " <episode>`.
fn split_season(rest: &str) -> Option<(&str, Option<&str>)> {
    let after = rest.strip_prefix("Season ")?;
    let digits_end = after
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after.len());
    if digits_end == 0 {
        return None;
    }
    let (season, tail) = after.split_at(digits_end);
    if tail.is_empty() {
        return Some((season, None));
    }
    tail.strip_prefix(SEPARATOR)
        .map(|episode| (season, Some(episode)))
}

/// Strictly parses `timestamp` with the given chrono format.
pub fn parse_date(timestamp: &str, format: &str) -> Result<NaiveDate, ParseError> {
    parse_date_at(0, timestamp, format, DateParsing::Strict)
}

fn parse_date_at(
    row: usize,
    timestamp: &str,
    format: &str,
    mode: DateParsing,
) -> Result<NaiveDate, ParseError> {
    let value = timestamp.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, format) {
        return Ok(date);
    }
    if mode == DateParsing::Lenient {
        if let Some(date) = LENIENT_FALLBACK_FORMATS
            .iter()
            .find_map(|fallback| NaiveDate::parse_from_str(value, fallback).ok())
        {
            debug!(row, value, "date parsed with fallback format");
            return Ok(date);
        }
    }
    Err(ParseError::InvalidDate {
        row,
        value: timestamp.to_string(),
        format: format.to_string(),
    })
}

pub fn derive_calendar_fields(date: NaiveDate) -> CalendarFields {
    let weekday = date.weekday().num_days_from_monday() as u8;
    let iso = date.iso_week();
    CalendarFields {
        weekday,
        iso_year: iso.year(),
        week_number: iso.week(),
        is_weekend: weekday >= 5,
    }
}

/// Parses a single record. `row` is used only to label errors.
pub fn normalize_record(
    row: usize,
    record: &RawRecord,
    options: &NormalizeOptions<'_>,
) -> Result<ViewingEvent, ParseError> {
    let date = parse_date_at(row, &record.timestamp, options.date_format, options.date_parsing)?;
    if record.title.trim().is_empty() {
        return Err(ParseError::EmptyTitle { row });
    }
    let (show_name, season, episode) = parse_title(&record.title);
    Ok(ViewingEvent {
        date,
        show_name,
        season,
        episode,
    })
}

/// Parses every record, drops events outside the analysis year and sorts
/// the rest by date.
///
/// The first malformed record aborts normalization.
pub fn normalize<I>(records: I, options: &NormalizeOptions<'_>) -> Result<Vec<ViewingEvent>, ParseError>
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut events = Vec::new();
    let mut parsed = 0usize;
    for (row, record) in records.into_iter().enumerate() {
        let event = normalize_record(row, &record, options)?;
        parsed += 1;
        if options.analysis_year.is_some_and(|year| event.date.year() != year) {
            continue;
        }
        events.push(event);
    }

    let dropped = parsed - events.len();
    if dropped > 0 {
        info!(dropped, year = ?options.analysis_year, "filtered events outside analysis year");
    }
    events.sort_by_key(|event| event.date);
    debug!(parsed, kept = events.len(), "normalized viewing records");
    Ok(events)
}
