//! Reductions of the classified event stream into count tables.
//!
//! Every table is keyed through a `BTreeMap`, so the output is sorted by its
//! grouping key and does not depend on the order of the input events.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    CategoricalAggregate, ClassifiedEvent, DailyAggregate, PeriodSummary, WeeklyAggregate,
};

/// Which calendar feature a categorical breakdown is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// 0 = Monday .. 6 = Sunday.
    Weekday,
    /// 0 = weekday, 1 = weekend.
    Weekend,
}

impl Dimension {
    fn value_of(self, event: &ClassifiedEvent) -> u8 {
        match self {
            Dimension::Weekday => event.weekday,
            Dimension::Weekend => u8::from(event.is_weekend),
        }
    }
}

pub fn daily_aggregate(events: &[ClassifiedEvent]) -> Vec<DailyAggregate> {
    struct Day<'a> {
        total_views: usize,
        shows: BTreeSet<&'a str>,
        is_period: bool,
        is_weekend: bool,
    }

    let mut days: BTreeMap<NaiveDate, Day<'_>> = BTreeMap::new();
    for event in events {
        let day = days.entry(event.date).or_insert_with(|| Day {
            total_views: 0,
            shows: BTreeSet::new(),
            is_period: event.is_period,
            is_weekend: event.is_weekend,
        });
        debug_assert_eq!(day.is_period, event.is_period);
        day.total_views += 1;
        day.shows.insert(&event.show_name);
    }

    days.into_iter()
        .map(|(date, day)| DailyAggregate {
            date,
            total_views: day.total_views,
            unique_shows: day.shows.len(),
            is_period: day.is_period,
            is_weekend: day.is_weekend,
        })
        .collect()
}

/// Weekly view counts keyed by ISO `(year, week)`, so that late-December
/// days counted in week 1 do not merge into the same year's first week.
pub fn weekly_aggregate(events: &[ClassifiedEvent]) -> Vec<WeeklyAggregate> {
    let mut weeks: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for event in events {
        *weeks.entry((event.iso_year, event.week_number)).or_insert(0) += 1;
    }

    weeks
        .into_iter()
        .map(|((year, week_number), total_views)| WeeklyAggregate {
            year,
            week_number,
            total_views,
        })
        .collect()
}

pub fn categorical_aggregate(
    events: &[ClassifiedEvent],
    dimension: Dimension,
) -> Vec<CategoricalAggregate> {
    let mut cells: BTreeMap<(bool, u8), usize> = BTreeMap::new();
    for event in events {
        *cells
            .entry((event.is_period, dimension.value_of(event)))
            .or_insert(0) += 1;
    }

    cells
        .into_iter()
        .map(|((is_period, dimension_value), count)| CategoricalAggregate {
            is_period,
            dimension_value,
            count,
        })
        .collect()
}

/// Totals per period class. Classes with no events get no row.
pub fn period_summary(events: &[ClassifiedEvent]) -> Vec<PeriodSummary> {
    #[derive(Default)]
    struct Class<'a> {
        total_views: usize,
        shows: BTreeSet<&'a str>,
        days: BTreeSet<NaiveDate>,
    }

    let mut classes: BTreeMap<bool, Class<'_>> = BTreeMap::new();
    for event in events {
        let class = classes.entry(event.is_period).or_default();
        class.total_views += 1;
        class.shows.insert(&event.show_name);
        class.days.insert(event.date);
    }

    classes
        .into_iter()
        .map(|(is_period, class)| PeriodSummary {
            is_period,
            total_views: class.total_views,
            unique_shows: class.shows.len(),
            unique_days: class.days.len(),
        })
        .collect()
}

/// Daily view counts split by a boolean day attribute, as `(when_false,
/// when_true)` samples.
pub fn split_daily_views<F>(daily: &[DailyAggregate], key: F) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(&DailyAggregate) -> bool,
{
    let mut when_false = Vec::new();
    let mut when_true = Vec::new();
    for day in daily {
        let views = day.total_views as f64;
        if key(day) {
            when_true.push(views);
        } else {
            when_false.push(views);
        }
    }
    (when_false, when_true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive_calendar_fields;
    use crate::models::ViewingEvent;
    use proptest::prelude::*;

    fn event(y: i32, m: u32, d: u32, show: &str, is_period: bool) -> ClassifiedEvent {
        event_on(NaiveDate::from_ymd_opt(y, m, d).unwrap(), show, is_period)
    }

    fn event_on(date: NaiveDate, show: &str, is_period: bool) -> ClassifiedEvent {
        ClassifiedEvent::new(
            ViewingEvent {
                date,
                show_name: show.to_string(),
                season: None,
                episode: None,
            },
            derive_calendar_fields(date),
            is_period,
        )
    }

    #[test]
    fn daily_counts_views_and_unique_shows() {
        let events = vec![
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 20, "Show B", false),
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 26, "Show C", true),
        ];
        let daily = daily_aggregate(&events);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        assert_eq!(daily[0].total_views, 1);
        assert!(!daily[0].is_period);
        assert_eq!(daily[1].total_views, 3);
        assert_eq!(daily[1].unique_shows, 2);
        assert!(daily[1].is_period);
    }

    #[test]
    fn weekly_keys_by_iso_year() {
        let events = vec![
            event(2024, 1, 2, "Show A", false),
            event(2024, 12, 30, "Show A", false),
            event(2024, 12, 31, "Show B", false),
        ];
        let weekly = weekly_aggregate(&events);
        assert_eq!(
            weekly,
            vec![
                WeeklyAggregate { year: 2024, week_number: 1, total_views: 1 },
                WeeklyAggregate { year: 2025, week_number: 1, total_views: 2 },
            ]
        );
    }

    #[test]
    fn categorical_breakdowns() {
        // 2024-03-23 is a Saturday, 2024-03-26 a Tuesday.
        let events = vec![
            event(2024, 3, 23, "Show A", false),
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 26, "Show B", true),
        ];
        let by_weekday = categorical_aggregate(&events, Dimension::Weekday);
        assert_eq!(
            by_weekday,
            vec![
                CategoricalAggregate { is_period: false, dimension_value: 5, count: 1 },
                CategoricalAggregate { is_period: true, dimension_value: 1, count: 2 },
            ]
        );
        let by_weekend = categorical_aggregate(&events, Dimension::Weekend);
        assert_eq!(by_weekend[0].dimension_value, 1);
        assert_eq!(by_weekend[1].count, 2);
    }

    #[test]
    fn period_summary_counts_distinct_days() {
        let events = vec![
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 27, "Show A", true),
            event(2024, 3, 20, "Show B", false),
        ];
        let summary = period_summary(&events);
        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary[1],
            PeriodSummary { is_period: true, total_views: 2, unique_shows: 1, unique_days: 2 }
        );
    }

    #[test]
    fn splits_daily_views() {
        let events = vec![
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 26, "Show A", true),
            event(2024, 3, 20, "Show B", false),
        ];
        let daily = daily_aggregate(&events);
        let (outside, inside) = split_daily_views(&daily, |d| d.is_period);
        assert_eq!(outside, vec![1.0]);
        assert_eq!(inside, vec![2.0]);
    }

    proptest! {
        #[test]
        fn aggregation_conserves_counts(
            raw in proptest::collection::vec((0i64..400, 0usize..4), 0..200),
        ) {
            let shows = ["A", "B", "C", "D"];
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let events: Vec<_> = raw
                .iter()
                .map(|(offset, show)| {
                    let date = base + chrono::Duration::days(*offset);
                    event_on(date, shows[*show], offset % 3 == 0)
                })
                .collect();

            let daily_total: usize = daily_aggregate(&events).iter().map(|d| d.total_views).sum();
            let weekly_total: usize = weekly_aggregate(&events).iter().map(|w| w.total_views).sum();
            prop_assert_eq!(daily_total, events.len());
            prop_assert_eq!(weekly_total, events.len());

            let mut reversed = events.clone();
            reversed.reverse();
            prop_assert_eq!(weekly_aggregate(&reversed), weekly_aggregate(&events));
        }
    }
}
