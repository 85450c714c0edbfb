use std::fmt::Write;

use crate::analysis::AnalysisReport;
use crate::hypothesis::{EffectSize, TestDetails, TestResult};

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn period_label(is_period: bool) -> &'static str {
    if is_period {
        "high-load periods"
    } else {
        "rest of year"
    }
}

/// Formats a statistic, printing `n/a` for undefined values.
fn number(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.4}")
    }
}

fn verdict(result: &TestResult, alpha: f64) -> &'static str {
    if !result.is_defined() {
        "not enough data to test"
    } else if result.is_significant(alpha) {
        "reject the null hypothesis"
    } else {
        "fail to reject the null hypothesis"
    }
}

fn write_test(output: &mut String, title: &str, result: &TestResult, alpha: f64) {
    let _ = writeln!(output);
    let _ = writeln!(output, "### {title}");
    let _ = writeln!(
        output,
        "- statistic {}, p-value {}: {}",
        number(result.statistic),
        number(result.p_value),
        verdict(result, alpha)
    );

    match &result.details {
        TestDetails::IndependentMean {
            mean_a,
            mean_b,
            std_a,
            std_b,
            n_a,
            n_b,
            cohens_d,
            effect_size,
        } => {
            let _ = writeln!(output, "- group A: mean {mean_a:.2} (SD {std_a:.2}, n={n_a})");
            let _ = writeln!(output, "- group B: mean {mean_b:.2} (SD {std_b:.2}, n={n_b})");
            let label = effect_size.map_or("undefined", EffectSize::label);
            let _ = writeln!(
                output,
                "- effect size is {label} (Cohen's d = {})",
                number(*cohens_d)
            );
        }
        TestDetails::RankSum {
            median_a, median_b, ..
        } => {
            let _ = writeln!(output, "- medians: A {median_a:.1}, B {median_b:.1}");
        }
        TestDetails::GoodnessOfFit {
            observed, expected, ..
        } => {
            for (o, e) in observed.iter().zip(expected) {
                let _ = writeln!(output, "- observed {o:.0}, expected {e:.1}");
            }
        }
        TestDetails::Contingency {
            degrees_of_freedom,
            yates_correction,
            ..
        } => {
            let correction = if *yates_correction { ", Yates corrected" } else { "" };
            let _ = writeln!(output, "- degrees of freedom {degrees_of_freedom}{correction}");
        }
        TestDetails::Correlation { n, .. } => {
            let _ = writeln!(output, "- {n} weeks");
        }
    }
}

/// Renders the analysis as Markdown. `alpha` decides the verdict lines.
pub fn build_report(report: &AnalysisReport, alpha: f64) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Viewing Habits: High-Load Periods vs Rest of Year");
    if let Some(window) = &report.window {
        let _ = writeln!(
            output,
            "Covering {} to {}: {} days inside periods, {} outside. Significance level {alpha}.",
            window.first, window.last, window.days_inside, window.days_outside
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Viewing Summary");
    if report.period_summary.is_empty() {
        let _ = writeln!(output, "No viewing recorded for this window.");
    } else {
        for summary in &report.period_summary {
            let _ = writeln!(
                output,
                "- {}: {} views of {} shows across {} days",
                period_label(summary.is_period),
                summary.total_views,
                summary.unique_shows,
                summary.unique_days
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Binge Sessions");
    if report.binges.is_empty() {
        let _ = writeln!(output, "No binge sessions detected.");
    } else {
        for ratio in &report.binge_ratios {
            let _ = writeln!(
                output,
                "- {}: {:.1}% of views were part of a binge ({} of {})",
                period_label(ratio.is_period),
                ratio.ratio * 100.0,
                ratio.binge_views,
                ratio.total_views
            );
        }
        let mut longest = report.binges.clone();
        longest.sort_by(|a, b| b.episode_count.cmp(&a.episode_count));
        for binge in longest.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {} episodes",
                binge.show_name, binge.date, binge.episode_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Day of Week");
    for cell in &report.weekday_breakdown {
        let _ = writeln!(
            output,
            "- {} {}: {} views",
            period_label(cell.is_period),
            WEEKDAY_NAMES[usize::from(cell.dimension_value) % 7],
            cell.count
        );
    }

    if let Some(trend) = &report.weekly_trend {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Weekly Pattern");
        let _ = writeln!(
            output,
            "- mean weekly views {:.2} (SD {:.2})",
            trend.mean_weekly_views, trend.std_weekly_views
        );
        let _ = writeln!(
            output,
            "- busiest week {}-W{:02} ({} views), quietest week {}-W{:02} ({} views)",
            trend.busiest_week.year,
            trend.busiest_week.week_number,
            trend.busiest_week.total_views,
            trend.quietest_week.year,
            trend.quietest_week.week_number,
            trend.quietest_week.total_views
        );
    }

    let tests = &report.tests;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Hypothesis Tests");
    write_test(&mut output, "Daily views, periods (A) vs rest (B): t-test", &tests.period_mean, alpha);
    write_test(
        &mut output,
        "Daily views, periods (A) vs rest (B): Mann-Whitney U",
        &tests.period_rank_sum,
        alpha,
    );
    write_test(&mut output, "Daily views, weekend (A) vs weekday (B): t-test", &tests.weekend_mean, alpha);
    write_test(&mut output, "Day-of-week distribution by period: chi-square", &tests.weekday_contingency, alpha);
    write_test(&mut output, "Weekend share by period: chi-square", &tests.weekend_contingency, alpha);
    if let Some(share) = &tests.period_share {
        write_test(&mut output, "Views vs calendar share of periods: chi-square", share, alpha);
    }
    write_test(&mut output, "Weekly trend: Pearson correlation", &tests.weekly_correlation, alpha);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::AnalysisConfig;
    use crate::models::RawRecord;

    #[test]
    fn renders_sections_and_verdicts() {
        let records = vec![
            RawRecord::new("03/26/24", "Show A: Season 1: Episode 1"),
            RawRecord::new("03/26/24", "Show A: Season 1: Episode 2"),
            RawRecord::new("03/26/24", "Show A: Season 1: Episode 3"),
            RawRecord::new("03/20/24", "Show B"),
        ];
        let report = analyze(records, &AnalysisConfig::default()).unwrap();
        let text = build_report(&report, 0.05);

        assert!(text.contains("## Viewing Summary"));
        assert!(text.contains("Show A on 2024-03-26: 3 episodes"));
        assert!(text.contains("not enough data to test"));
        assert!(text.contains("## Weekly Pattern"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = analyze(Vec::<RawRecord>::new(), &AnalysisConfig::default()).unwrap();
        let text = build_report(&report, 0.05);
        assert!(text.contains("No viewing recorded for this window."));
        assert!(text.contains("No binge sessions detected."));
    }
}
