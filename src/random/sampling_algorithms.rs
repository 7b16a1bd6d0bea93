//! Sampling primitives used by the contact process: uniform choice from an indexable
//! collection, and inverse-CDF lookup over a cumulative distribution.

use crate::rand::Rng;

/// Sample an element uniformly from a slice. Returns `None` for an empty slice rather than
/// attempting to draw from an empty range.
pub fn choose_from_slice<'a, R, T>(rng: &mut R, items: &'a [T]) -> Option<&'a T>
where
    R: Rng,
{
    if items.is_empty() {
        return None;
    }
    // This little trick with `u32` is faster than drawing a `usize` range.
    let index = rng.random_range(0..items.len() as u32) as usize;
    items.get(index)
}

/// Inverse-CDF lookup: the smallest index `i` with `cumulative[i] > u`.
///
/// `cumulative` must be non-decreasing and end at (approximately) `1.0`. When
/// floating-point rounding leaves the final entry at or below `u`, the last index is
/// returned, so the lookup always lands on a valid category.
///
/// # Panics
///
/// Panics if `cumulative` is empty.
#[must_use]
pub fn first_exceedance(cumulative: &[f64], u: f64) -> usize {
    assert!(!cumulative.is_empty(), "cumulative distribution is empty");
    // Rows hold one entry per age band.
    cumulative
        .iter()
        .position(|&c| c > u)
        .unwrap_or(cumulative.len() - 1)
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn choose_from_empty_slice_is_none() {
        let mut rng = SmallRng::seed_from_u64(42);
        let empty: [u32; 0] = [];
        assert!(choose_from_slice(&mut rng, &empty).is_none());
    }

    #[test]
    fn choose_from_singleton() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(choose_from_slice(&mut rng, &[7]), Some(&7));
        }
    }

    #[test]
    fn first_exceedance_boundaries() {
        let cumulative = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(first_exceedance(&cumulative, 0.0), 0);
        assert_eq!(first_exceedance(&cumulative, 0.2499), 0);
        // strictly greater: a draw equal to a boundary falls into the next category
        assert_eq!(first_exceedance(&cumulative, 0.25), 1);
        assert_eq!(first_exceedance(&cumulative, 0.9999), 3);
    }

    #[test]
    fn first_exceedance_skips_zero_mass_categories() {
        let cumulative = [0.0, 0.0, 0.6, 0.6, 1.0];
        assert_eq!(first_exceedance(&cumulative, 0.0), 2);
        assert_eq!(first_exceedance(&cumulative, 0.6), 4);
    }

    #[test]
    fn first_exceedance_clamps_rounding_shortfall() {
        let cumulative = [0.5, 0.999_999_999_9];
        assert_eq!(first_exceedance(&cumulative, 0.999_999_999_95), 1);
    }

    // Draws many categories from a uniform cumulative row and checks the counts against
    // the uniform expectation with a chi-square test.
    #[test]
    fn first_exceedance_uniformity() {
        let categories = 7;
        let cumulative: Vec<f64> = (1..=categories)
            .map(|i| f64::from(i) / f64::from(categories))
            .collect();
        let draws = 70_000;
        let mut rng = SmallRng::seed_from_u64(42);
        let mut counts = vec![0usize; categories as usize];
        for _ in 0..draws {
            let u: f64 = rng.random();
            counts[first_exceedance(&cumulative, u)] += 1;
        }

        let expected = f64::from(draws) / f64::from(categories);
        let chi_square: f64 = counts
            .iter()
            .map(|&obs| {
                let diff = obs as f64 - expected;
                diff * diff / expected
            })
            .sum();

        // Critical χ²₀.₉₉₉ for df=6 is 22.458
        assert!(
            chi_square < 22.458,
            "partner bands are not uniform: χ² = {}, counts = {:?}",
            chi_square,
            counts
        );
    }
}
