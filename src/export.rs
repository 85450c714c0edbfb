//! Flat-file input and output: viewing-history CSV in, CSV tables and JSON
//! test results out.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::analysis::{AnalysisReport, AnalysisWindow, TestSuite, WeeklyTrend};
use crate::error::ExportError;
use crate::models::{BingeRatio, RawRecord};

/// Reads a viewing-history export with `Title` and `Date` columns.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, ExportError> {
    let records = read_records_from(fs::File::open(path)?)?;
    info!(path = %path.display(), records = records.len(), "loaded viewing history");
    Ok(records)
}

pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<RawRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawRecord>() {
        records.push(result?);
    }
    Ok(records)
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf, ExportError> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Writes every aggregate table of `report` into `dir` and returns the
/// paths written.
pub fn write_tables(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    let written = vec![
        write_table(dir, "processed_viewing_events.csv", &report.events)?,
        write_table(dir, "daily_viewing_counts.csv", &report.daily)?,
        write_table(dir, "weekly_viewing_counts.csv", &report.weekly)?,
        write_table(dir, "day_of_week_stats.csv", &report.weekday_breakdown)?,
        write_table(dir, "weekend_stats.csv", &report.weekend_breakdown)?,
        write_table(dir, "period_stats.csv", &report.period_summary)?,
        write_table(dir, "binge_sessions.csv", &report.binges)?,
        write_table(dir, "binge_ratios.csv", &report.binge_ratios)?,
    ];
    info!(dir = %dir.display(), files = written.len(), "wrote aggregate tables");
    Ok(written)
}

/// Writes the test suite, trend and window as pretty JSON. Undefined
/// statistics are written as `null`.
pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<(), ExportError> {
    #[derive(Serialize)]
    struct Results<'a> {
        window: &'a Option<AnalysisWindow>,
        weekly_trend: &'a Option<WeeklyTrend>,
        binge_ratios: &'a [BingeRatio],
        tests: &'a TestSuite,
    }

    let results = Results {
        window: &report.window,
        weekly_trend: &report.weekly_trend,
        binge_ratios: &report.binge_ratios,
        tests: &report.tests,
    };
    fs::write(path, serde_json::to_string_pretty(&results)?)?;
    Ok(())
}
