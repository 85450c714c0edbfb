//! Two-sample and categorical hypothesis tests with effect sizes.
//!
//! Every test is a pure function of its numeric inputs. The significance
//! level is never fixed here; callers pass it to
//! [`TestResult::is_significant`].
//!
//! Degenerate inputs that are a legitimate data edge case (an empty sample,
//! a period with no viewing) produce a result whose statistic and p-value
//! are `NaN` instead of an error. Inputs whose shapes do not fit together are
//! a caller defect and are rejected with [`InputMismatchError`].

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};
use tracing::debug;

use crate::error::InputMismatchError;
use crate::models::CategoricalAggregate;
use crate::stats::{self, Ranking};

/// Both samples must be smaller than this, and tie-free, for the rank-sum
/// test to use the exact null distribution.
const EXACT_RANK_SUM_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    IndependentMean,
    RankSum,
    GoodnessOfFit,
    Contingency,
    Correlation,
}

/// Cohen's d buckets, shared by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    /// Buckets `|d|`. Returns `None` when `d` is `NaN`.
    pub fn classify(d: f64) -> Option<Self> {
        let magnitude = d.abs();
        if magnitude.is_nan() {
            None
        } else if magnitude < 0.2 {
            Some(Self::Negligible)
        } else if magnitude < 0.5 {
            Some(Self::Small)
        } else if magnitude < 0.8 {
            Some(Self::Medium)
        } else {
            Some(Self::Large)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSumMethod {
    Exact,
    Asymptotic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test_kind", rename_all = "snake_case")]
pub enum TestDetails {
    IndependentMean {
        mean_a: f64,
        mean_b: f64,
        /// Sample standard deviations; 0 when the sample has fewer than two
        /// values.
        std_a: f64,
        std_b: f64,
        n_a: usize,
        n_b: usize,
        cohens_d: f64,
        effect_size: Option<EffectSize>,
    },
    RankSum {
        median_a: f64,
        median_b: f64,
        n_a: usize,
        n_b: usize,
        method: Option<RankSumMethod>,
    },
    GoodnessOfFit {
        observed: Vec<f64>,
        expected: Vec<f64>,
        degrees_of_freedom: usize,
    },
    Contingency {
        observed: Vec<Vec<f64>>,
        expected: Vec<Vec<f64>>,
        degrees_of_freedom: usize,
        yates_correction: bool,
    },
    Correlation {
        coefficient: f64,
        n: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    #[serde(flatten)]
    pub details: TestDetails,
}

impl TestResult {
    fn undefined(details: TestDetails) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            details,
        }
    }

    pub fn kind(&self) -> TestKind {
        match self.details {
            TestDetails::IndependentMean { .. } => TestKind::IndependentMean,
            TestDetails::RankSum { .. } => TestKind::RankSum,
            TestDetails::GoodnessOfFit { .. } => TestKind::GoodnessOfFit,
            TestDetails::Contingency { .. } => TestKind::Contingency,
            TestDetails::Correlation { .. } => TestKind::Correlation,
        }
    }

    /// Whether the test could be computed at all.
    pub fn is_defined(&self) -> bool {
        !self.p_value.is_nan()
    }

    /// `p < alpha`. An undefined result is never significant.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Two-sided p-value of a Student's t statistic.
fn t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Upper tail of the chi-square distribution. `NaN` for zero degrees of
/// freedom.
fn chi_square_sf(statistic: f64, df: usize) -> f64 {
    if statistic.is_nan() || df == 0 {
        return f64::NAN;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(statistic),
        Err(_) => f64::NAN,
    }
}

/// Student's independent two-sample t-test with pooled variance, plus
/// Cohen's d.
///
/// An empty sample, or two samples of one value each (zero degrees of
/// freedom), give a `NaN` statistic, p-value and d.
pub fn independent_mean_test(sample_a: &[f64], sample_b: &[f64]) -> TestResult {
    let (n_a, n_b) = (sample_a.len(), sample_b.len());
    let mean_a = stats::mean(sample_a).unwrap_or(0.0);
    let mean_b = stats::mean(sample_b).unwrap_or(0.0);
    let var_a = stats::sample_variance(sample_a).unwrap_or(0.0);
    let var_b = stats::sample_variance(sample_b).unwrap_or(0.0);

    let details = |cohens_d: f64| TestDetails::IndependentMean {
        mean_a,
        mean_b,
        std_a: var_a.sqrt(),
        std_b: var_b.sqrt(),
        n_a,
        n_b,
        cohens_d,
        effect_size: EffectSize::classify(cohens_d),
    };

    if n_a == 0 || n_b == 0 || n_a + n_b < 3 {
        debug!(n_a, n_b, "too few observations for a t-test");
        return TestResult::undefined(details(f64::NAN));
    }

    let df = (n_a + n_b - 2) as f64;
    let pooled_var = ((n_a - 1) as f64 * var_a + (n_b - 1) as f64 * var_b) / df;
    let pooled_sd = pooled_var.sqrt();
    let diff = mean_a - mean_b;
    let cohens_d = if pooled_sd == 0.0 { 0.0 } else { diff / pooled_sd };

    let std_err = pooled_sd * (1.0 / n_a as f64 + 1.0 / n_b as f64).sqrt();
    let statistic = diff / std_err;

    TestResult {
        statistic,
        p_value: t_two_sided(statistic, df),
        details: details(cohens_d),
    }
}

/// Mann-Whitney U test, two-sided. The statistic is U of `sample_a`.
///
/// Small tie-free samples use the exact null distribution; otherwise the
/// normal approximation with tie and continuity correction is used. When
/// every value is tied the p-value is 1.
pub fn rank_sum_test(sample_a: &[f64], sample_b: &[f64]) -> TestResult {
    let (n_a, n_b) = (sample_a.len(), sample_b.len());
    let details = |method| TestDetails::RankSum {
        median_a: stats::median(sample_a).unwrap_or(0.0),
        median_b: stats::median(sample_b).unwrap_or(0.0),
        n_a,
        n_b,
        method,
    };

    if n_a == 0 || n_b == 0 {
        debug!(n_a, n_b, "empty sample for rank-sum test");
        return TestResult::undefined(details(None));
    }

    let pooled: Vec<f64> = sample_a.iter().chain(sample_b).copied().collect();
    let ranking = Ranking::new(&pooled);
    let rank_sum_a: f64 = ranking.ranks[..n_a].iter().sum();
    let (fa, fb) = (n_a as f64, n_b as f64);
    let u_a = rank_sum_a - fa * (fa + 1.0) / 2.0;
    let u_max = u_a.max(fa * fb - u_a);

    if n_a < EXACT_RANK_SUM_LIMIT && n_b < EXACT_RANK_SUM_LIMIT && !ranking.has_ties() {
        let freq = exact_u_frequencies(n_a, n_b);
        let total: f64 = freq.iter().sum();
        // Tie-free U values are whole numbers.
        let upper: f64 = freq[u_max.round() as usize..].iter().sum();
        return TestResult {
            statistic: u_a,
            p_value: (2.0 * upper / total).min(1.0),
            details: details(Some(RankSumMethod::Exact)),
        };
    }

    let n = fa + fb;
    let mu = fa * fb / 2.0;
    let sigma = (fa * fb / 12.0 * ((n + 1.0) - ranking.tie_term() / (n * (n - 1.0)))).sqrt();
    let p_value = if sigma > 0.0 {
        let z = (u_max - mu - 0.5) / sigma;
        match Normal::new(0.0, 1.0) {
            Ok(normal) => (2.0 * normal.sf(z)).clamp(0.0, 1.0),
            Err(_) => f64::NAN,
        }
    } else {
        1.0
    };

    TestResult {
        statistic: u_a,
        p_value,
        details: details(Some(RankSumMethod::Asymptotic)),
    }
}

/// Frequencies of each U value under the null for sample sizes `m` and `n`.
///
/// Built from the recurrence on which sample holds the largest value: it
/// beats all `n` values of the other sample or none of them.
fn exact_u_frequencies(m: usize, n: usize) -> Vec<f64> {
    let mut table: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); n + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=n {
            let freq = if i == 0 || j == 0 {
                vec![1.0]
            } else {
                let mut freq = vec![0.0; i * j + 1];
                for (u, count) in table[i - 1][j].iter().enumerate() {
                    freq[u + j] += count;
                }
                for (u, count) in table[i][j - 1].iter().enumerate() {
                    freq[u] += count;
                }
                freq
            };
            table[i][j] = freq;
        }
    }
    std::mem::take(&mut table[m][n])
}

/// Expected class frequencies proportional to the number of days in each
/// class: `total * days_i / Σ days`.
pub fn expected_from_days(total: f64, days: &[u64]) -> Result<Vec<f64>, InputMismatchError> {
    let total_days: u64 = days.iter().sum();
    if total_days == 0 {
        return Err(InputMismatchError::new("day counts sum to zero"));
    }
    Ok(days
        .iter()
        .map(|&d| total * d as f64 / total_days as f64)
        .collect())
}

/// Pearson chi-square goodness-of-fit test.
///
/// `expected` is rescaled to the observed total when the two totals differ.
pub fn goodness_of_fit_test(
    observed: &[f64],
    expected: &[f64],
) -> Result<TestResult, InputMismatchError> {
    if observed.len() != expected.len() {
        return Err(InputMismatchError::new(format!(
            "{} observed classes but {} expected",
            observed.len(),
            expected.len()
        )));
    }
    if observed.is_empty() {
        return Err(InputMismatchError::new("no classes to compare"));
    }
    if observed.iter().any(|o| !o.is_finite() || *o < 0.0) {
        return Err(InputMismatchError::new("observed counts must be finite and non-negative"));
    }
    if expected.iter().any(|e| !e.is_finite() || *e <= 0.0) {
        return Err(InputMismatchError::new("expected counts must be finite and positive"));
    }

    let observed_total: f64 = observed.iter().sum();
    let expected_total: f64 = expected.iter().sum();
    let scale = observed_total / expected_total;
    let expected: Vec<f64> = if (scale - 1.0).abs() > 1e-9 {
        expected.iter().map(|e| e * scale).collect()
    } else {
        expected.to_vec()
    };

    let statistic: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e).powi(2) / e)
        .sum();
    let degrees_of_freedom = observed.len() - 1;

    Ok(TestResult {
        statistic,
        p_value: chi_square_sf(statistic, degrees_of_freedom),
        details: TestDetails::GoodnessOfFit {
            observed: observed.to_vec(),
            expected,
            degrees_of_freedom,
        },
    })
}

/// A rectangular table of non-negative counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    cells: Vec<Vec<f64>>,
    column_labels: Vec<u8>,
}

impl ContingencyTable {
    /// Columns are labelled `0..` in order.
    pub fn new(cells: Vec<Vec<f64>>) -> Result<Self, InputMismatchError> {
        let width = cells.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(InputMismatchError::new("contingency table is empty"));
        }
        if cells.iter().any(|row| row.len() != width) {
            return Err(InputMismatchError::new("contingency table rows differ in length"));
        }
        if cells.iter().flatten().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(InputMismatchError::new("contingency counts must be finite and non-negative"));
        }
        let column_labels = (0..width).map(|c| c as u8).collect();
        Ok(Self {
            cells,
            column_labels,
        })
    }

    /// Pivots categorical counts into an `is_period × dimension` table.
    ///
    /// Row 0 is outside the periods and row 1 inside. Columns are the
    /// distinct dimension values in ascending order; missing cells are 0.
    pub fn from_categorical(aggregates: &[CategoricalAggregate]) -> Self {
        let mut column_labels: Vec<u8> = aggregates.iter().map(|a| a.dimension_value).collect();
        column_labels.sort_unstable();
        column_labels.dedup();

        let mut cells = vec![vec![0.0; column_labels.len()]; 2];
        for aggregate in aggregates {
            if let Ok(column) = column_labels.binary_search(&aggregate.dimension_value) {
                cells[usize::from(aggregate.is_period)][column] += aggregate.count as f64;
            }
        }

        Self {
            cells,
            column_labels,
        }
    }

    pub fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    pub fn column_labels(&self) -> &[u8] {
        &self.column_labels
    }

    /// Copy of the table without rows or columns whose total is zero.
    fn without_empty_margins(&self) -> Vec<Vec<f64>> {
        let width = self.column_labels.len();
        let keep_columns: Vec<usize> = (0..width)
            .filter(|&c| self.cells.iter().any(|row| row[c] > 0.0))
            .collect();
        self.cells
            .iter()
            .filter(|row| row.iter().any(|&c| c > 0.0))
            .map(|row| keep_columns.iter().map(|&c| row[c]).collect())
            .collect()
    }
}

/// Chi-square test of independence.
///
/// Empty rows and columns are dropped first; if fewer than two of either
/// remain, the result is undefined with zero degrees of freedom. With one
/// degree of freedom the Yates continuity correction is applied.
pub fn contingency_test(table: &ContingencyTable) -> TestResult {
    let observed = table.without_empty_margins();
    let rows = observed.len();
    let columns = observed.first().map_or(0, Vec::len);

    if rows < 2 || columns < 2 {
        debug!(rows, columns, "contingency table has fewer than two non-empty rows or columns");
        return TestResult::undefined(TestDetails::Contingency {
            observed,
            expected: Vec::new(),
            degrees_of_freedom: 0,
            yates_correction: false,
        });
    }

    let row_totals: Vec<f64> = observed.iter().map(|row| row.iter().sum()).collect();
    let column_totals: Vec<f64> = (0..columns)
        .map(|c| observed.iter().map(|row| row[c]).sum())
        .collect();
    let grand_total: f64 = row_totals.iter().sum();

    let expected: Vec<Vec<f64>> = row_totals
        .iter()
        .map(|r| column_totals.iter().map(|c| r * c / grand_total).collect())
        .collect();
    let degrees_of_freedom = (rows - 1) * (columns - 1);
    let yates_correction = degrees_of_freedom == 1;

    let mut statistic = 0.0;
    for (observed_row, expected_row) in observed.iter().zip(&expected) {
        for (&o, &e) in observed_row.iter().zip(expected_row) {
            let deviation = if yates_correction {
                ((o - e).abs() - 0.5).max(0.0)
            } else {
                o - e
            };
            statistic += deviation * deviation / e;
        }
    }

    TestResult {
        statistic,
        p_value: chi_square_sf(statistic, degrees_of_freedom),
        details: TestDetails::Contingency {
            observed,
            expected,
            degrees_of_freedom,
            yates_correction,
        },
    }
}

/// Pearson correlation between two equal-length sequences.
///
/// The statistic is r itself. Fewer than two points or a constant sequence
/// give an undefined result; exactly two points give p = 1.
pub fn correlation_test(x: &[f64], y: &[f64]) -> Result<TestResult, InputMismatchError> {
    if x.len() != y.len() {
        return Err(InputMismatchError::new(format!(
            "correlation needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    let undefined = || {
        TestResult::undefined(TestDetails::Correlation {
            coefficient: f64::NAN,
            n,
        })
    };

    let (Some(mean_x), Some(mean_y)) = (stats::mean(x), stats::mean(y)) else {
        return Ok(undefined());
    };
    if n < 2 {
        return Ok(undefined());
    }

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        debug!(n, "constant input, correlation is undefined");
        return Ok(undefined());
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p_value = if n == 2 {
        1.0
    } else if r.abs() == 1.0 {
        0.0
    } else {
        let df = (n - 2) as f64;
        t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)
    };

    Ok(TestResult {
        statistic: r,
        p_value,
        details: TestDetails::Correlation { coefficient: r, n },
    })
}
