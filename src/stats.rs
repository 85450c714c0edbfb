//! Descriptive helpers shared by the hypothesis tests.
//!
//! All functions take raw `f64` samples and return `None` when the sample is
//! too small for the measure to be defined.

/// Arithmetic mean. `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased sample variance (`n - 1` denominator). `None` when `n < 2`.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some(sum_sq / (values.len() - 1) as f64)
}

pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Median, averaging the two middle values for even-sized samples.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Ranks of the pooled sample, with ties given their average rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// 1-based rank of each input value, in input order.
    pub ranks: Vec<f64>,
    /// Sizes of every group of tied values (groups of one included).
    pub tie_groups: Vec<usize>,
}

impl Ranking {
    pub fn new(values: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let mut ranks = vec![0.0; values.len()];
        let mut tie_groups = Vec::new();
        let mut start = 0;
        while start < order.len() {
            let mut end = start + 1;
            while end < order.len() && values[order[end]] == values[order[start]] {
                end += 1;
            }
            // Positions start..end hold ranks start+1..=end.
            let average = (start + 1 + end) as f64 / 2.0;
            for &index in &order[start..end] {
                ranks[index] = average;
            }
            tie_groups.push(end - start);
            start = end;
        }

        Self { ranks, tie_groups }
    }

    pub fn has_ties(&self) -> bool {
        self.tie_groups.iter().any(|&size| size > 1)
    }

    /// `Σ(t³ - t)` over tie groups, used by the rank-sum variance correction.
    pub fn tie_term(&self) -> f64 {
        self.tie_groups
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_measures() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert!((sample_variance(&values).unwrap() - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(median(&values), Some(4.5));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn undefined_for_small_samples() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(sample_variance(&[1.0]), None);
    }

    #[test]
    fn ranks_average_ties() {
        let ranking = Ranking::new(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranking.ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert!(ranking.has_ties());
        assert_eq!(ranking.tie_term(), 6.0);
    }
}
