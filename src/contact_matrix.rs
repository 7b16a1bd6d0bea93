//! Age-stratified contact intensities.
//!
//! The raw matrix is row-normalized into a partner distribution per source band and then
//! accumulated row-wise, so that a partner band can be drawn by inverse-CDF lookup.
use crate::age_group::AgeGroup;
use crate::error::ModelError;
use crate::random::first_exceedance;

#[derive(Debug, Clone, PartialEq)]
pub struct ContactMatrix {
    rates: Vec<Vec<f64>>,
    normalized: Vec<Vec<f64>>,
    cumulative: Vec<Vec<f64>>,
}

impl ContactMatrix {
    /// Reference contact rates between the seven default age bands.
    #[must_use]
    pub fn default_rates() -> Vec<Vec<f64>> {
        vec![
            vec![2.5982, 0.8003, 0.3160, 0.7934, 0.3557, 0.1548, 0.0564],
            vec![0.6473, 4.1960, 0.6603, 0.5901, 0.4665, 0.1238, 0.0515],
            vec![0.1737, 1.7500, 11.1061, 0.9782, 0.7263, 0.0815, 0.0273],
            vec![0.5504, 0.5906, 1.2004, 1.8813, 0.9165, 0.1370, 0.0397],
            vec![0.3894, 0.7848, 1.3139, 1.1414, 1.3347, 0.2260, 0.0692],
            vec![0.3610, 0.3918, 0.3738, 0.5248, 0.5140, 0.7072, 0.1469],
            vec![0.1588, 0.3367, 0.3406, 0.2286, 0.3637, 0.3392, 0.3868],
        ]
    }

    /// A matrix in which every band contacts every band with equal intensity.
    #[must_use]
    pub fn uniform(size: usize) -> Vec<Vec<f64>> {
        vec![vec![1.0; size]; size]
    }

    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` if the matrix is empty or not square, holds a
    /// negative or non-finite entry, or has a row summing to zero.
    pub fn new(rates: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let size = rates.len();
        if size == 0 {
            return Err(ModelError::ConfigError("contact matrix is empty".into()));
        }
        let mut normalized = Vec::with_capacity(size);
        let mut cumulative = Vec::with_capacity(size);
        for (i, row) in rates.iter().enumerate() {
            if row.len() != size {
                return Err(ModelError::ConfigError(format!(
                    "contact matrix row {i} has {} entries, expected {size}",
                    row.len()
                )));
            }
            if row.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(ModelError::ConfigError(format!(
                    "contact matrix row {i} has a negative or non-finite entry"
                )));
            }
            let total: f64 = row.iter().sum();
            if total <= 0.0 {
                return Err(ModelError::ConfigError(format!(
                    "contact matrix row {i} sums to zero"
                )));
            }
            let normalized_row: Vec<f64> = row.iter().map(|r| r / total).collect();
            let cumulative_row: Vec<f64> = normalized_row
                .iter()
                .scan(0.0, |running, p| {
                    *running += p;
                    Some(*running)
                })
                .collect();
            normalized.push(normalized_row);
            cumulative.push(cumulative_row);
        }
        Ok(ContactMatrix {
            rates,
            normalized,
            cumulative,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    #[must_use]
    pub fn rates(&self) -> &[Vec<f64>] {
        &self.rates
    }

    /// Row-stochastic form: row `i` is the distribution of partner bands for band `i`.
    #[must_use]
    pub fn normalized(&self) -> &[Vec<f64>] {
        &self.normalized
    }

    #[must_use]
    pub fn cumulative_row(&self, source: AgeGroup) -> &[f64] {
        &self.cumulative[source.index()]
    }

    /// The partner band for a contact initiated from `source`, given a uniform draw
    /// `u` on `[0, 1)`.
    #[must_use]
    pub fn partner_group(&self, source: AgeGroup, u: f64) -> AgeGroup {
        AgeGroup(first_exceedance(self.cumulative_row(source), u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use crate::numeric::ACC;

    #[test]
    fn rows_are_stochastic() {
        let matrix = ContactMatrix::new(ContactMatrix::default_rates()).unwrap();
        for row in matrix.normalized() {
            assert_almost_eq!(row.iter().sum::<f64>(), 1.0, ACC);
        }
        for source in 0..matrix.len() {
            let cumulative = matrix.cumulative_row(AgeGroup(source));
            assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
            assert_almost_eq!(cumulative[cumulative.len() - 1], 1.0, ACC);
        }
    }

    #[test]
    fn asymmetry_is_preserved() {
        let matrix = ContactMatrix::new(ContactMatrix::default_rates()).unwrap();
        assert_ne!(matrix.rates()[0][1], matrix.rates()[1][0]);
    }

    #[test]
    fn partner_group_follows_cumulative_row() {
        let matrix = ContactMatrix::new(vec![vec![1.0, 3.0], vec![0.0, 2.0]]).unwrap();
        assert_eq!(matrix.partner_group(AgeGroup(0), 0.1), AgeGroup(0));
        assert_eq!(matrix.partner_group(AgeGroup(0), 0.25), AgeGroup(1));
        // band 1 never contacts band 0
        assert_eq!(matrix.partner_group(AgeGroup(1), 0.0), AgeGroup(1));
    }

    #[test]
    fn rejects_degenerate_matrices() {
        assert!(ContactMatrix::new(Vec::new()).is_err());
        assert!(ContactMatrix::new(vec![vec![1.0, 1.0], vec![0.0, 0.0]]).is_err());
        assert!(ContactMatrix::new(vec![vec![1.0, -1.0], vec![1.0, 1.0]]).is_err());
        assert!(ContactMatrix::new(vec![vec![1.0, 1.0], vec![1.0]]).is_err());
    }
}
