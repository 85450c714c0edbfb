use chrono::NaiveDate;
use viewing_periods::export::{read_records, write_json, write_tables};
use viewing_periods::hypothesis::independent_mean_test;
use viewing_periods::models::{BingeFlag, RawRecord};
use viewing_periods::{analyze, AnalysisConfig, PeriodInterval, PeriodSet};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn exam_week_config() -> AnalysisConfig {
    AnalysisConfig {
        analysis_year: Some(2024),
        periods: PeriodSet::new(vec![
            PeriodInterval::new(date(2024, 3, 25), date(2024, 3, 29)).unwrap(),
        ]),
        ..AnalysisConfig::default()
    }
}

fn history() -> Vec<RawRecord> {
    vec![
        RawRecord::new("03/26/24", "Show A: Season 1: Episode 1"),
        RawRecord::new("03/26/24", "Show A: Season 1: Episode 2"),
        RawRecord::new("03/26/24", "Show A: Season 1: Episode 3"),
        RawRecord::new("03/26/24", "Show A: Season 1: Episode 4"),
        RawRecord::new("03/20/24", "Show B: Season 2: Episode 7"),
        RawRecord::new("12/31/23", "Last Year: Season 1: Episode 1"),
    ]
}

#[test]
fn exam_week_binge_end_to_end() {
    let report = analyze(history(), &exam_week_config()).unwrap();

    assert_eq!(report.events.len(), 5);
    let daily: Vec<(NaiveDate, usize, bool)> = report
        .daily
        .iter()
        .map(|day| (day.date, day.total_views, day.is_period))
        .collect();
    assert_eq!(
        daily,
        vec![(date(2024, 3, 20), 1, false), (date(2024, 3, 26), 4, true)]
    );

    assert_eq!(
        report.binges,
        vec![BingeFlag {
            date: date(2024, 3, 26),
            show_name: "Show A".to_string(),
            episode_count: 4,
        }]
    );

    let direct = independent_mean_test(&[4.0], &[1.0]);
    assert!(direct.p_value.is_nan());
    assert!(report.tests.period_mean.p_value.is_nan());
    assert!(!report.tests.period_mean.is_defined());
}

#[test]
fn tables_and_json_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("history.csv");
    std::fs::write(
        &input,
        "Title,Date\n\
         \"Show A: Season 1: Episode 1\",03/26/24\n\
         \"Show A: Season 1: Episode 2\",03/26/24\n\
         \"Show A: Season 1: Episode 3\",03/26/24\n\
         \"Show B: Season 2: Episode 7\",03/20/24\n",
    )
    .unwrap();

    let records = read_records(&input).unwrap();
    let report = analyze(records, &exam_week_config()).unwrap();
    let out = dir.path().join("out");
    let written = write_tables(&report, &out).unwrap();
    assert_eq!(written.len(), 8);

    let mut reader = csv::Reader::from_path(out.join("daily_viewing_counts.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["date", "total_views", "unique_shows", "is_period", "is_weekend"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "2024-03-20");
    assert_eq!(&rows[1][1], "3");
    assert_eq!(&rows[1][3], "true");

    let json_path = out.join("test_results.json");
    write_json(&report, &json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["tests"]["period_mean"]["test_kind"], "independent_mean");
    assert!(json["tests"]["period_mean"]["p_value"].is_null());
    assert_eq!(json["window"]["days_inside"], 5);
}

#[test]
fn unparseable_date_aborts_the_run() {
    let records = vec![RawRecord::new("2024-03-26", "Show A")];
    assert!(analyze(records, &exam_week_config()).is_err());
}
