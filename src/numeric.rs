//! Floating-point comparison and the small set of summary statistics the model records
//! (means, dispersion, trapezoidal areas).
//!
//! All functions here are total: degenerate inputs (empty slices, zero counts) produce `0.0`
//! rather than `NaN`, so aggregate series stay finite.

// Loss of precision is allowable when converting counts to `f64` in this module.
#![allow(clippy::cast_precision_loss)]

use approx::AbsDiffEq;

/// Targeted accuracy instantiated over `f64`
pub const ACC: f64 = 10e-11;

/// Compares if two floats are close via `approx::abs_diff_eq` using a maximum absolute difference
/// (epsilon) of `acc`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, acc: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a == b;
    }
    a.abs_diff_eq(&b, acc)
}

/// Arithmetic mean, `0.0` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`), `0.0` for an empty slice.
#[must_use]
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`), `0.0` for an empty slice.
#[must_use]
pub fn population_std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Area under `values` sampled at unit spacing, by the trapezoidal rule.
///
/// Sequences shorter than two samples enclose no area.
#[must_use]
pub fn trapezoid(values: &[f64]) -> f64 {
    values
        .windows(2)
        .map(|pair| 0.5 * (pair[0] + pair[1]))
        .sum()
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
#[must_use]
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_almost_eq, assert_series_almost_eq};

    #[test]
    fn almost_eq_within_tolerance() {
        assert!(almost_eq(1.0, 1.0 + 0.5e-11, ACC));
        assert!(!almost_eq(1.0, 1.0 + 2e-10, ACC));
    }

    #[test]
    fn almost_eq_infinities() {
        assert!(almost_eq(f64::INFINITY, f64::INFINITY, ACC));
        assert!(!almost_eq(f64::INFINITY, f64::NEG_INFINITY, ACC));
    }

    #[test]
    fn trapezoid_of_constant_sequence() {
        for k in 1..10 {
            let values = vec![0.75; k];
            assert_almost_eq!(trapezoid(&values), 0.75 * (k as f64 - 1.0), ACC);
        }
    }

    #[test]
    fn trapezoid_of_ramp() {
        // 0..=4 is a triangle with base 4 and height 4
        assert_almost_eq!(trapezoid(&[0.0, 1.0, 2.0, 3.0, 4.0]), 8.0, ACC);
        assert_eq!(trapezoid(&[]), 0.0);
    }

    #[test]
    fn std_dev_matches_numpy_population_convention() {
        // np.std([2, 4, 4, 4, 5, 5, 7, 9]) == 2.0
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_almost_eq!(population_std_dev(&values), 2.0, ACC);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(ratio_or_zero(3.0, 0.0), 0.0);
        assert_almost_eq!(ratio_or_zero(3.0, 4.0), 0.75, ACC);
    }

    #[test]
    fn series_macro_passes_on_close_series() {
        assert_series_almost_eq!(vec![1.0, 2.0], vec![1.0, 2.0 + 1e-12], ACC);
    }

    #[test]
    #[should_panic(expected = "assertion failed at position 1")]
    fn series_macro_reports_position() {
        assert_series_almost_eq!(vec![1.0, 2.0], vec![1.0, 2.5], 1e-4);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn assert_almost_eq_macro_panics() {
        assert_almost_eq!(1.0, 1.001, 1e-4);
    }
}
