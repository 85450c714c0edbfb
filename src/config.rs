//! Run configuration, loaded from TOML or built in code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binge::DEFAULT_BINGE_THRESHOLD;
use crate::error::ConfigError;
use crate::features::{DateParsing, NormalizeOptions, DEFAULT_DATE_FORMAT};
use crate::periods::PeriodSet;

pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Everything a pipeline run needs besides the records themselves.
///
/// ```toml
/// analysis_year = 2024
/// binge_threshold = 3
/// significance_level = 0.05
///
/// [[periods]]
/// start = "2024-03-25"
/// end = "2024-03-29"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// chrono format string for the timestamp column.
    pub date_format: String,
    pub date_parsing: DateParsing,
    /// Calendar year to keep; events from other years are filtered out.
    pub analysis_year: Option<i32>,
    pub binge_threshold: usize,
    pub significance_level: f64,
    pub periods: PeriodSet,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            date_parsing: DateParsing::Strict,
            analysis_year: None,
            binge_threshold: DEFAULT_BINGE_THRESHOLD,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            periods: PeriodSet::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Interval bounds are checked when intervals are built, so this only
    /// covers the scalar knobs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binge_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(self.binge_threshold));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigError::InvalidSignificance(self.significance_level));
        }
        Ok(())
    }

    pub fn normalize_options(&self) -> NormalizeOptions<'_> {
        NormalizeOptions {
            date_format: &self.date_format,
            date_parsing: self.date_parsing,
            analysis_year: self.analysis_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn defaults_when_fields_missing() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.binge_threshold, 3);
        assert_eq!(config.significance_level, 0.05);
        assert_eq!(config.date_parsing, DateParsing::Strict);
    }

    #[test]
    fn parses_periods() {
        let config = AnalysisConfig::from_toml(
            r#"
            analysis_year = 2024
            date_parsing = "lenient"

            [[periods]]
            start = "2024-12-29"
            end = "2025-01-09"

            [[periods]]
            start = "2024-03-25"
            end = "2024-03-29"
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis_year, Some(2024));
        assert_eq!(config.date_parsing, DateParsing::Lenient);
        assert_eq!(config.periods.len(), 2);
        assert!(config.periods.classify(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }

    #[test]
    fn rejects_inverted_interval() {
        let err = AnalysisConfig::from_toml(
            r#"
            [[periods]]
            start = "2024-06-07"
            end = "2024-06-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().contains("2024-06-07"));
    }

    #[test]
    fn rejects_bad_knobs() {
        let err = AnalysisConfig::from_toml("binge_threshold = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(0)));
        let err = AnalysisConfig::from_toml("significance_level = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignificance(_)));
    }

    #[test]
    fn bundled_exam_calendar_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/exam_periods.toml");
        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.periods.len(), 11);
        let days = config.periods.days_in(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(days, [280, 86]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalysisConfig::load(Path::new("/nonexistent/periods.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
