//! Age bands and the classifier mapping an age to its band.
//!
//! Bands are contiguous, inclusive integer ranges. Each band carries the per-step death
//! probability of its Infectious members, the immunosenescence factor scaling how fast their
//! viral load decays, and the weight with which new agents are drawn into it.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Index of an age band, in band order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgeGroup(pub usize);

impl AgeGroup {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

fn default_weight() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub low: u32,
    pub high: u32,
    /// Probability per step that an Infectious member dies.
    pub death_rate: f64,
    /// Scales the per-step decline of viral load; higher is a stronger immune response.
    pub immunosenescence_factor: f64,
    /// Relative share of the population drawn into this band.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl AgeBand {
    #[must_use]
    pub fn new(low: u32, high: u32, death_rate: f64, immunosenescence_factor: f64) -> Self {
        AgeBand {
            low,
            high,
            death_rate,
            immunosenescence_factor,
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn contains(&self, age: u32) -> bool {
        self.low <= age && age <= self.high
    }

    /// The `"low-high"` label used in reports.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// A validated, ordered partition of ages into bands.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBands {
    bands: Vec<AgeBand>,
}

impl AgeBands {
    /// The seven reference bands: 0-4, 5-14, 15-19, 20-39, 40-59, 60-69 and 70-100, equally
    /// weighted, with a flat 7% death rate and immunosenescence falling with age.
    #[must_use]
    pub fn default_bands() -> Vec<AgeBand> {
        let bounds = [(0, 4), (5, 14), (15, 19), (20, 39), (40, 59), (60, 69), (70, 100)];
        let factors = [0.95, 0.75, 0.7, 0.5, 0.3, 0.2, 0.1];
        bounds
            .iter()
            .zip(factors)
            .map(|(&(low, high), factor)| AgeBand::new(low, high, 0.07, factor))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` if the bands are empty, overlap, leave gaps, or
    /// carry rates or weights outside their domains.
    pub fn new(bands: Vec<AgeBand>) -> Result<Self, ModelError> {
        if bands.is_empty() {
            return Err(ModelError::ConfigError("no age bands given".into()));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.low > band.high {
                return Err(ModelError::ConfigError(format!(
                    "age band {i} has low {} above high {}",
                    band.low, band.high
                )));
            }
            if !(0.0..=1.0).contains(&band.death_rate) {
                return Err(ModelError::ConfigError(format!(
                    "age band {band} has death rate {} outside [0, 1]",
                    band.death_rate
                )));
            }
            if !band.immunosenescence_factor.is_finite() || band.immunosenescence_factor < 0.0 {
                return Err(ModelError::ConfigError(format!(
                    "age band {band} has a negative immunosenescence factor"
                )));
            }
            if !band.weight.is_finite() || band.weight < 0.0 {
                return Err(ModelError::ConfigError(format!(
                    "age band {band} has a negative weight"
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].low != pair[0].high + 1 {
                return Err(ModelError::ConfigError(format!(
                    "age bands {} and {} are not contiguous",
                    pair[0], pair[1]
                )));
            }
        }
        if bands.iter().map(|b| b.weight).sum::<f64>() <= 0.0 {
            return Err(ModelError::ConfigError(
                "age band weights sum to zero".into(),
            ));
        }
        Ok(AgeBands { bands })
    }

    /// Maps `age` to the unique band containing it.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvariantViolation` if no band contains `age`; ages are only
    /// ever drawn from within a band, so this indicates a defect.
    pub fn classify(&self, age: u32) -> Result<AgeGroup, ModelError> {
        self.bands
            .iter()
            .position(|band| band.contains(age))
            .map(AgeGroup)
            .ok_or_else(|| {
                ModelError::InvariantViolation(format!(
                    "age {age} is outside every age band ({}-{})",
                    self.bands[0].low,
                    self.bands[self.bands.len() - 1].high
                ))
            })
    }

    #[must_use]
    pub fn get(&self, group: AgeGroup) -> &AgeBand {
        &self.bands[group.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgeBand> {
        self.bands.iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = AgeGroup> {
        (0..self.bands.len()).map(AgeGroup)
    }

    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.bands.iter().map(AgeBand::label).collect()
    }

    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.weight).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_bands() -> AgeBands {
        AgeBands::new(AgeBands::default_bands()).unwrap()
    }

    #[test]
    fn classifies_band_edges() {
        let bands = default_bands();
        assert_eq!(bands.classify(0).unwrap(), AgeGroup(0));
        assert_eq!(bands.classify(4).unwrap(), AgeGroup(0));
        assert_eq!(bands.classify(5).unwrap(), AgeGroup(1));
        assert_eq!(bands.classify(39).unwrap(), AgeGroup(3));
        assert_eq!(bands.classify(40).unwrap(), AgeGroup(4));
        assert_eq!(bands.classify(100).unwrap(), AgeGroup(6));
    }

    #[test]
    fn unclassifiable_age_is_an_invariant_violation() {
        let bands = default_bands();
        let err = bands.classify(101).unwrap_err();
        assert!(matches!(err, ModelError::InvariantViolation(msg) if msg.contains("age 101")));
    }

    #[test]
    fn band_lookups() {
        let bands = default_bands();
        assert_eq!(bands.len(), 7);
        assert_eq!(bands.get(AgeGroup(6)).immunosenescence_factor, 0.1);
        assert_eq!(bands.labels()[2], "15-19");
        assert_eq!(bands.groups().last(), Some(AgeGroup(6)));
    }

    #[test]
    fn rejects_gaps_and_overlaps() {
        let gap = vec![AgeBand::new(0, 4, 0.1, 0.5), AgeBand::new(6, 10, 0.1, 0.5)];
        assert!(matches!(AgeBands::new(gap), Err(ModelError::ConfigError(_))));

        let overlap = vec![AgeBand::new(0, 4, 0.1, 0.5), AgeBand::new(4, 10, 0.1, 0.5)];
        assert!(matches!(
            AgeBands::new(overlap),
            Err(ModelError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_bad_rates() {
        let bad_death = vec![AgeBand::new(0, 4, 1.5, 0.5)];
        assert!(AgeBands::new(bad_death).is_err());

        let mut zero_weight = AgeBand::new(0, 4, 0.1, 0.5);
        zero_weight.weight = 0.0;
        assert!(AgeBands::new(vec![zero_weight]).is_err());

        assert!(AgeBands::new(Vec::new()).is_err());
    }
}
