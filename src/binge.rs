//! Binge sessions: many episodes of the same show on the same day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{BingeFlag, BingeRatio, ClassifiedEvent};

pub const DEFAULT_BINGE_THRESHOLD: usize = 3;

/// Flags every `(date, show)` pair with at least `threshold` events.
///
/// Output is sorted by date, then show name.
pub fn detect_binges(events: &[ClassifiedEvent], threshold: usize) -> Vec<BingeFlag> {
    let mut counts: BTreeMap<(NaiveDate, &str), usize> = BTreeMap::new();
    for event in events {
        *counts.entry((event.date, event.show_name.as_str())).or_insert(0) += 1;
    }

    let binges: Vec<BingeFlag> = counts
        .into_iter()
        .filter(|&(_, episode_count)| episode_count >= threshold)
        .map(|((date, show_name), episode_count)| BingeFlag {
            date,
            show_name: show_name.to_string(),
            episode_count,
        })
        .collect();
    debug!(threshold, sessions = binges.len(), "detected binge sessions");
    binges
}

/// Share of each period class's events that belong to a binge session.
///
/// Only classes with at least one event are reported, so the ratio never
/// divides by zero.
pub fn binge_ratio(events: &[ClassifiedEvent], binges: &[BingeFlag]) -> Vec<BingeRatio> {
    let flagged: BTreeSet<(NaiveDate, &str)> = binges
        .iter()
        .map(|flag| (flag.date, flag.show_name.as_str()))
        .collect();

    let mut classes: BTreeMap<bool, (usize, usize)> = BTreeMap::new();
    for event in events {
        let (binge_views, total_views) = classes.entry(event.is_period).or_insert((0, 0));
        *total_views += 1;
        if flagged.contains(&(event.date, event.show_name.as_str())) {
            *binge_views += 1;
        }
    }

    classes
        .into_iter()
        .map(|(is_period, (binge_views, total_views))| BingeRatio {
            is_period,
            binge_views,
            total_views,
            ratio: binge_views as f64 / total_views as f64,
        })
        .collect()
}
