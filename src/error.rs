use chrono::NaiveDate;
use thiserror::Error;

/// A raw viewing record could not be turned into a [`ViewingEvent`].
///
/// `row` is the zero-based position of the record in the input sequence.
///
/// [`ViewingEvent`]: crate::models::ViewingEvent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("row {row}: date {value:?} does not match format {format:?}")]
    InvalidDate {
        row: usize,
        value: String,
        format: String,
    },
    #[error("row {row}: title is empty")]
    EmptyTitle { row: usize },
}

/// Caller handed a test or table inputs of incompatible shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("input mismatch: {0}")]
pub struct InputMismatchError(pub String);

impl InputMismatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("period interval starts on {start} but ends on {end}")]
    InvertedInterval { start: NaiveDate, end: NaiveDate },
    #[error("binge threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),
    #[error("significance level must be in (0, 1), got {0}")]
    InvalidSignificance(f64),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    InputMismatch(#[from] InputMismatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
