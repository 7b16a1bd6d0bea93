//! Summary statistics over sets of replicate series.
//!
//! Inputs are rectangular: each row is one series (a replicate, or an agent), each column a
//! timestep. Every function returns `0.0` where a quantity is undefined instead of `NaN`.

// Loss of precision is allowable when converting counts to `f64` in this module.
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::error::ModelError;
use crate::numeric::{mean, population_variance, ratio_or_zero};

/// z-score of a two-sided 90% normal interval.
pub const Z_90: f64 = 1.645;

/// Per-timestep spread of a set of series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceSeries {
    pub mean: Vec<f64>,
    /// Population variance across series.
    pub variance: Vec<f64>,
    pub std_dev: Vec<f64>,
    /// Half-width of the 90% confidence interval of the mean, `1.645 * sd / sqrt(n)`.
    pub ci_half_width: Vec<f64>,
}

impl ConfidenceSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Computes the per-column mean, variance, standard deviation and 90% CI half-width of
/// `series`. No series give an empty result.
///
/// # Errors
///
/// Returns `ModelError::InvariantViolation` if the series differ in length.
pub fn confidence_series(series: &[Vec<f64>]) -> Result<ConfidenceSeries, ModelError> {
    let Some(first) = series.first() else {
        return Ok(ConfidenceSeries::default());
    };
    let columns = first.len();
    if let Some(row) = series.iter().position(|s| s.len() != columns) {
        return Err(ModelError::InvariantViolation(format!(
            "series {row} has {} entries, expected {columns}",
            series[row].len()
        )));
    }

    let n = series.len() as f64;
    let mut result = ConfidenceSeries::default();
    let mut column = Vec::with_capacity(series.len());
    for t in 0..columns {
        column.clear();
        column.extend(series.iter().map(|s| s[t]));
        let variance = population_variance(&column);
        let std_dev = variance.sqrt();
        result.mean.push(mean(&column));
        result.variance.push(variance);
        result.std_dev.push(std_dev);
        result.ci_half_width.push(Z_90 * std_dev / n.sqrt());
    }
    Ok(result)
}

/// Element-wise `numerator / denominator`, with `0.0` wherever the denominator is zero.
/// The result is as long as the shorter input.
#[must_use]
pub fn ratio_series(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(a, b)| ratio_or_zero(*a, *b))
        .collect()
}

/// Slope of `values` sampled at unit spacing: central differences in the interior and
/// one-sided differences at the ends. A single sample has slope zero.
#[must_use]
pub fn gradient(values: &[f64]) -> Vec<f64> {
    match values.len() {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

/// How two bands' confidence intervals compare over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceComparison {
    /// `first.ci_half_width / second.ci_half_width`, 0.0 where the second is zero.
    pub ratio: Vec<f64>,
    pub slope: Vec<f64>,
}

#[must_use]
pub fn compare_confidence(
    first: &ConfidenceSeries,
    second: &ConfidenceSeries,
) -> ConfidenceComparison {
    let ratio = ratio_series(&first.ci_half_width, &second.ci_half_width);
    let slope = gradient(&ratio);
    ConfidenceComparison { ratio, slope }
}

/// Infectious over Exposed at each entry of a mean S, E, I, R, D trajectory, 0.0 where no
/// agent is Exposed.
#[must_use]
pub fn infected_exposed_ratio(compartment_counts: &[[f64; 5]]) -> Vec<f64> {
    compartment_counts
        .iter()
        .map(|counts| ratio_or_zero(counts[2], counts[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::ACC;
    use crate::{assert_almost_eq, assert_series_almost_eq};

    #[test]
    fn confidence_of_two_replicates() {
        let series = vec![vec![1.0, 2.0, 5.0], vec![3.0, 2.0, 1.0]];
        let ci = confidence_series(&series).unwrap();
        assert_eq!(ci.len(), 3);
        assert_series_almost_eq!(ci.mean, [2.0, 2.0, 3.0], ACC);
        assert_series_almost_eq!(ci.variance, [1.0, 0.0, 4.0], ACC);
        assert_series_almost_eq!(ci.std_dev, [1.0, 0.0, 2.0], ACC);
        assert_almost_eq!(ci.ci_half_width[0], 1.645 / 2f64.sqrt(), ACC);
        assert_eq!(ci.ci_half_width[1], 0.0);
    }

    #[test]
    fn confidence_of_nothing_is_empty() {
        assert!(confidence_series(&[]).unwrap().is_empty());
    }

    #[test]
    fn ragged_series_are_rejected() {
        let series = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            confidence_series(&series),
            Err(ModelError::InvariantViolation(_))
        ));
    }

    #[test]
    fn ratio_uses_zero_sentinel() {
        assert_eq!(ratio_series(&[1.0, 4.0, 3.0], &[2.0, 0.0, 3.0]), vec![0.5, 0.0, 1.0]);
    }

    #[test]
    fn gradient_matches_central_differences() {
        assert_series_almost_eq!(
            gradient(&[1.0, 2.0, 4.0, 7.0, 11.0]),
            [1.0, 1.5, 2.5, 3.5, 4.0],
            ACC
        );
        assert_eq!(gradient(&[3.0]), vec![0.0]);
        assert!(gradient(&[]).is_empty());
        assert_eq!(gradient(&[1.0, 3.0]), vec![2.0, 2.0]);
    }

    #[test]
    fn comparison_slope_follows_ratio() {
        let wide = confidence_series(&[vec![0.0, 0.0, 0.0], vec![2.0, 4.0, 6.0]]).unwrap();
        let narrow = confidence_series(&[vec![0.0, 0.0, 0.0], vec![2.0, 2.0, 2.0]]).unwrap();
        let comparison = compare_confidence(&wide, &narrow);
        assert_series_almost_eq!(comparison.ratio, [1.0, 2.0, 3.0], ACC);
        assert_series_almost_eq!(comparison.slope, [1.0, 1.0, 1.0], ACC);
    }

    #[test]
    fn infected_over_exposed() {
        let trajectory = [[10.0, 4.0, 2.0, 0.0, 0.0], [12.0, 0.0, 3.0, 1.0, 0.0]];
        assert_eq!(infected_exposed_ratio(&trajectory), vec![0.5, 0.0]);
    }
}
