//! Viewing-history analysis: compares how much someone watches during
//! configured high-load periods (exam weeks, crunch time) against the rest
//! of the year.
//!
//! The pipeline runs in one pass over a viewing-history export:
//! [`features`] parses titles and dates, [`periods`] labels each event,
//! [`aggregate`] and [`binge`] build the summary tables, and
//! [`hypothesis`] runs the statistical comparisons. [`analysis::analyze`]
//! wires them together.

pub mod aggregate;
pub mod analysis;
pub mod binge;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod hypothesis;
pub mod models;
pub mod periods;
pub mod report;
pub mod stats;

pub use analysis::{analyze, AnalysisReport};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ConfigError, ExportError, InputMismatchError, ParseError};
pub use hypothesis::{EffectSize, TestDetails, TestKind, TestResult};
pub use periods::{PeriodInterval, PeriodSet};
