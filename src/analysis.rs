//! End-to-end run: raw records in, aggregates and test results out.

use std::cmp::Reverse;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{
    categorical_aggregate, daily_aggregate, period_summary, split_daily_views, weekly_aggregate,
    Dimension,
};
use crate::binge::{binge_ratio, detect_binges};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::normalize;
use crate::hypothesis::{
    contingency_test, correlation_test, expected_from_days, goodness_of_fit_test,
    independent_mean_test, rank_sum_test, ContingencyTable, TestResult,
};
use crate::models::{
    BingeFlag, BingeRatio, CategoricalAggregate, ClassifiedEvent, DailyAggregate, PeriodSummary,
    RawRecord, WeeklyAggregate,
};
use crate::periods::classify_events;
use crate::stats;

/// The calendar range the run covers, with its day counts per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub days_outside: u64,
    pub days_inside: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub mean_weekly_views: f64,
    pub std_weekly_views: f64,
    pub busiest_week: WeeklyAggregate,
    pub quietest_week: WeeklyAggregate,
}

/// The fixed battery of comparisons run over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSuite {
    /// Daily views inside (a) versus outside (b) the periods.
    pub period_mean: TestResult,
    pub period_rank_sum: TestResult,
    /// Daily views on weekends (a) versus weekdays (b).
    pub weekend_mean: TestResult,
    pub weekday_contingency: TestResult,
    pub weekend_contingency: TestResult,
    /// Views per class against the share of calendar days in each class.
    /// Absent when either class has no calendar days in the window.
    pub period_share: Option<TestResult>,
    /// Week index against weekly views.
    pub weekly_correlation: TestResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    #[serde(skip)]
    pub events: Vec<ClassifiedEvent>,
    pub window: Option<AnalysisWindow>,
    pub daily: Vec<DailyAggregate>,
    pub weekly: Vec<WeeklyAggregate>,
    pub weekday_breakdown: Vec<CategoricalAggregate>,
    pub weekend_breakdown: Vec<CategoricalAggregate>,
    pub period_summary: Vec<PeriodSummary>,
    pub binges: Vec<BingeFlag>,
    pub binge_ratios: Vec<BingeRatio>,
    pub weekly_trend: Option<WeeklyTrend>,
    pub tests: TestSuite,
}

pub fn analyze<I>(records: I, config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError>
where
    I: IntoIterator<Item = RawRecord>,
{
    config.validate()?;

    let events = normalize(records, &config.normalize_options())?;
    let events = classify_events(events, &config.periods);
    info!(
        events = events.len(),
        periods = config.periods.len(),
        "classified viewing events"
    );

    let daily = daily_aggregate(&events);
    let weekly = weekly_aggregate(&events);
    let weekday_breakdown = categorical_aggregate(&events, Dimension::Weekday);
    let weekend_breakdown = categorical_aggregate(&events, Dimension::Weekend);
    let period_summary = period_summary(&events);
    info!(days = daily.len(), weeks = weekly.len(), "aggregated viewing counts");

    let binges = detect_binges(&events, config.binge_threshold);
    let binge_ratios = binge_ratio(&events, &binges);
    info!(sessions = binges.len(), threshold = config.binge_threshold, "detected binge sessions");

    let window = analysis_window(&events, config);
    let tests = run_tests(&events, &daily, &weekly, &weekday_breakdown, &weekend_breakdown, window)?;

    Ok(AnalysisReport {
        weekly_trend: weekly_trend(&weekly),
        events,
        window,
        daily,
        weekly,
        weekday_breakdown,
        weekend_breakdown,
        period_summary,
        binges,
        binge_ratios,
        tests,
    })
}

/// The analysis year when one is configured, otherwise the span of the
/// observed events.
fn analysis_window(events: &[ClassifiedEvent], config: &AnalysisConfig) -> Option<AnalysisWindow> {
    let (first, last) = match config.analysis_year {
        Some(year) => (
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ),
        None => (events.first()?.date, events.last()?.date),
    };
    let [days_outside, days_inside] = config.periods.days_in(first, last);
    Some(AnalysisWindow {
        first,
        last,
        days_outside,
        days_inside,
    })
}

fn run_tests(
    events: &[ClassifiedEvent],
    daily: &[DailyAggregate],
    weekly: &[WeeklyAggregate],
    weekday_breakdown: &[CategoricalAggregate],
    weekend_breakdown: &[CategoricalAggregate],
    window: Option<AnalysisWindow>,
) -> Result<TestSuite, AnalysisError> {
    let (outside, inside) = split_daily_views(daily, |day| day.is_period);
    let (weekdays, weekends) = split_daily_views(daily, |day| day.is_weekend);

    let period_mean = independent_mean_test(&inside, &outside);
    if !period_mean.is_defined() {
        warn!(
            inside_days = inside.len(),
            outside_days = outside.len(),
            "period comparison is undefined for this data"
        );
    }
    let period_rank_sum = rank_sum_test(&inside, &outside);
    let weekend_mean = independent_mean_test(&weekends, &weekdays);

    let weekday_contingency =
        contingency_test(&ContingencyTable::from_categorical(weekday_breakdown));
    let weekend_contingency =
        contingency_test(&ContingencyTable::from_categorical(weekend_breakdown));

    let period_share = match window {
        Some(window) if window.days_inside > 0 && window.days_outside > 0 && !events.is_empty() => {
            let views_inside = events.iter().filter(|e| e.is_period).count() as f64;
            let observed = [events.len() as f64 - views_inside, views_inside];
            let expected = expected_from_days(
                events.len() as f64,
                &[window.days_outside, window.days_inside],
            )?;
            Some(goodness_of_fit_test(&observed, &expected)?)
        }
        _ => {
            warn!("skipping period share test, a class has no calendar days or there are no events");
            None
        }
    };

    let (week_index, weekly_views) = week_series(weekly);
    let weekly_correlation = correlation_test(&week_index, &weekly_views)?;

    Ok(TestSuite {
        period_mean,
        period_rank_sum,
        weekend_mean,
        weekday_contingency,
        weekend_contingency,
        period_share,
        weekly_correlation,
    })
}

/// Weeks since the first observed ISO week, paired with that week's views.
///
/// The index is derived from each week's Monday, so it keeps increasing
/// across an ISO year boundary.
fn week_series(weekly: &[WeeklyAggregate]) -> (Vec<f64>, Vec<f64>) {
    let mondays: Vec<(NaiveDate, usize)> = weekly
        .iter()
        .filter_map(|week| {
            NaiveDate::from_isoywd_opt(week.year, week.week_number, Weekday::Mon)
                .map(|monday| (monday, week.total_views))
        })
        .collect();
    let Some(&(origin, _)) = mondays.first() else {
        return (Vec::new(), Vec::new());
    };
    mondays
        .iter()
        .map(|&(monday, views)| ((monday - origin).num_weeks() as f64, views as f64))
        .unzip()
}

fn weekly_trend(weekly: &[WeeklyAggregate]) -> Option<WeeklyTrend> {
    let views: Vec<f64> = weekly.iter().map(|w| w.total_views as f64).collect();
    Some(WeeklyTrend {
        mean_weekly_views: stats::mean(&views)?,
        std_weekly_views: stats::sample_std_dev(&views).unwrap_or(0.0),
        busiest_week: weekly.iter().min_by_key(|w| Reverse(w.total_views))?.clone(),
        quietest_week: weekly.iter().min_by_key(|w| w.total_views)?.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::{PeriodInterval, PeriodSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            analysis_year: Some(2024),
            periods: PeriodSet::new(vec![
                PeriodInterval::new(date(2024, 3, 25), date(2024, 3, 29)).unwrap(),
            ]),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn week_index_crosses_iso_year() {
        let weekly = vec![
            WeeklyAggregate { year: 2024, week_number: 51, total_views: 3 },
            WeeklyAggregate { year: 2024, week_number: 52, total_views: 5 },
            WeeklyAggregate { year: 2025, week_number: 1, total_views: 7 },
        ];
        let (index, views) = week_series(&weekly);
        assert_eq!(index, vec![0.0, 1.0, 2.0]);
        assert_eq!(views, vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn trend_picks_first_extremes() {
        let weekly = vec![
            WeeklyAggregate { year: 2024, week_number: 1, total_views: 2 },
            WeeklyAggregate { year: 2024, week_number: 2, total_views: 9 },
            WeeklyAggregate { year: 2024, week_number: 3, total_views: 9 },
            WeeklyAggregate { year: 2024, week_number: 4, total_views: 2 },
        ];
        let trend = weekly_trend(&weekly).unwrap();
        assert_eq!(trend.mean_weekly_views, 5.5);
        assert_eq!(trend.busiest_week.week_number, 2);
        assert_eq!(trend.quietest_week.week_number, 1);
        assert!(weekly_trend(&[]).is_none());
    }

    #[test]
    fn window_covers_analysis_year() {
        let window = analysis_window(&[], &config()).unwrap();
        assert_eq!(window.days_inside, 5);
        assert_eq!(window.days_outside, 361);
    }

    #[test]
    fn empty_input_yields_undefined_tests() {
        let report = analyze(Vec::<RawRecord>::new(), &config()).unwrap();
        assert!(report.daily.is_empty());
        assert!(!report.tests.period_mean.is_defined());
        assert!(!report.tests.weekly_correlation.is_defined());
        assert!(report.tests.period_share.is_none());
        assert!(report.weekly_trend.is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AnalysisConfig {
            binge_threshold: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze(Vec::<RawRecord>::new(), &config),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn period_share_uses_calendar_days() {
        let records = vec![
            RawRecord::new("03/26/24", "Show A"),
            RawRecord::new("03/27/24", "Show A"),
            RawRecord::new("04/10/24", "Show B"),
        ];
        let report = analyze(records, &config()).unwrap();
        let share = report.tests.period_share.unwrap();
        let crate::hypothesis::TestDetails::GoodnessOfFit { observed, expected, .. } = share.details
        else {
            panic!("wrong details");
        };
        assert_eq!(observed, vec![1.0, 2.0]);
        assert!((expected[1] - 3.0 * 5.0 / 366.0).abs() < 1e-12);
    }
}
