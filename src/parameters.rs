//! Model parameters.
//!
//! Every field has a default reproducing the reference scenario (500 agents, seven age
//! bands, 60 daily steps, 500 contact trials per step), so a configuration file only needs
//! to name the values it changes:
//!
//! ```json
//! { "population": 1000, "time_steps": 120, "num_simulations": 20 }
//! ```
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::age_group::{AgeBand, AgeBands};
use crate::contact_matrix::ContactMatrix;
use crate::error::ModelError;

/// Base values of the per-agent viral-load thresholds. Each agent jitters these by up to
/// ±50% when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseThresholds {
    /// Susceptible → Exposed when the load exceeds this.
    pub exposure: f64,
    /// Exposed → Infectious when the load exceeds this within the latent period.
    pub infectious: f64,
    /// Infectious → Recovered when the load falls to or below this.
    pub recovery: f64,
}

impl Default for BaseThresholds {
    fn default() -> Self {
        BaseThresholds {
            exposure: 0.05,
            infectious: 0.9,
            recovery: 0.2,
        }
    }
}

/// How ragged viral-load histories are combined into a per-band profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePadding {
    /// Shorter histories are padded with zeros and the pads count as readings, which pulls
    /// the tail of the profile toward zero.
    #[default]
    ZeroFill,
    /// Each position averages only the histories that reach it.
    ObservedOnly,
}

fn default_population() -> usize {
    500
}
fn default_initial_recovered() -> usize {
    10
}
fn default_initial_infectious() -> usize {
    20
}
fn default_initial_exposed() -> usize {
    20
}
fn default_latent_period() -> u32 {
    5
}
fn default_time_steps() -> usize {
    60
}
fn default_num_simulations() -> usize {
    2
}
fn default_contact_trials() -> usize {
    500
}
fn default_threads() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    #[serde(default = "default_population")]
    pub population: usize,
    #[serde(default = "default_initial_recovered")]
    pub initial_recovered: usize,
    #[serde(default = "default_initial_infectious")]
    pub initial_infectious: usize,
    #[serde(default = "default_initial_exposed")]
    pub initial_exposed: usize,
    /// Days an Exposed agent has to become Infectious before it recovers.
    #[serde(default = "default_latent_period")]
    pub latent_period: u32,
    #[serde(default = "default_time_steps")]
    pub time_steps: usize,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,
    /// Random pairings drawn per timestep. Not scaled with the population size.
    #[serde(default = "default_contact_trials")]
    pub contact_trials: usize,
    #[serde(default)]
    pub thresholds: BaseThresholds,
    #[serde(default = "AgeBands::default_bands")]
    pub age_bands: Vec<AgeBand>,
    /// Row `i`, column `j`: relative intensity of contacts a member of band `i` makes
    /// with band `j`.
    #[serde(default = "ContactMatrix::default_rates")]
    pub contact_matrix: Vec<Vec<f64>>,
    #[serde(default)]
    pub profile_padding: ProfilePadding,
    /// Base seed; replicate `r` runs with `seed + r`.
    #[serde(default)]
    pub seed: u64,
    /// Worker threads used to run replicates.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            population: default_population(),
            initial_recovered: default_initial_recovered(),
            initial_infectious: default_initial_infectious(),
            initial_exposed: default_initial_exposed(),
            latent_period: default_latent_period(),
            time_steps: default_time_steps(),
            num_simulations: default_num_simulations(),
            contact_trials: default_contact_trials(),
            thresholds: BaseThresholds::default(),
            age_bands: AgeBands::default_bands(),
            contact_matrix: ContactMatrix::default_rates(),
            profile_padding: ProfilePadding::default(),
            seed: 0,
            threads: default_threads(),
        }
    }
}

/// Parameters after validation, with the derived lookup structures built once and shared
/// by every replicate.
#[derive(Debug, Clone)]
pub struct Model {
    pub params: Params,
    pub age_bands: AgeBands,
    pub contact_matrix: ContactMatrix,
}

impl Params {
    /// Number of agents seeded outside Susceptible, or `None` if the counts overflow.
    #[must_use]
    pub fn seeded(&self) -> Option<usize> {
        self.initial_recovered
            .checked_add(self.initial_infectious)?
            .checked_add(self.initial_exposed)
    }

    /// Checks everything that can be known before a step runs and builds the derived
    /// structures.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` naming the first offending parameter.
    pub fn validate(self) -> Result<Model, ModelError> {
        let seeded = self.seeded().ok_or_else(|| {
            ModelError::ConfigError(
                "initial recovered + infectious + exposed overflows the agent count".into(),
            )
        })?;
        if seeded > self.population {
            return Err(ModelError::ConfigError(format!(
                "initial recovered + infectious + exposed ({seeded}) exceeds population ({})",
                self.population
            )));
        }
        if self.population == 0 {
            return Err(ModelError::ConfigError("population must be positive".into()));
        }
        if self.num_simulations == 0 {
            return Err(ModelError::ConfigError(
                "num_simulations must be at least 1".into(),
            ));
        }
        if self.threads == 0 {
            return Err(ModelError::ConfigError("threads must be at least 1".into()));
        }
        let BaseThresholds {
            exposure,
            infectious,
            recovery,
        } = self.thresholds;
        if [exposure, infectious, recovery]
            .iter()
            .any(|t| !t.is_finite() || *t < 0.0)
        {
            return Err(ModelError::ConfigError(
                "thresholds must be finite and non-negative".into(),
            ));
        }

        let age_bands = AgeBands::new(self.age_bands.clone())?;
        let contact_matrix = ContactMatrix::new(self.contact_matrix.clone())?;
        if contact_matrix.len() != age_bands.len() {
            return Err(ModelError::ConfigError(format!(
                "contact matrix is {0}x{0} but there are {1} age bands",
                contact_matrix.len(),
                age_bands.len()
            )));
        }
        debug!("validated parameters: {self:?}");

        Ok(Model {
            params: self,
            age_bands,
            contact_matrix,
        })
    }
}

/// Reads `Params` from a JSON file. Fields missing from the file take their defaults.
///
/// # Errors
///
/// Returns `ModelError::IoError` if the file cannot be read and `ModelError::JsonError`
/// if it does not describe `Params`.
pub fn load_params_from_json(file_path: &Path) -> Result<Params, ModelError> {
    info!("Loading parameters from: {}", file_path.display());
    let raw = fs::read_to_string(file_path)?;
    let params = serde_json::from_str(&raw)?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_validate() {
        let model = Params::default().validate().unwrap();
        assert_eq!(model.age_bands.len(), 7);
        assert_eq!(model.contact_matrix.len(), 7);
        assert_eq!(model.params.contact_trials, 500);
    }

    #[test]
    fn rejects_overfull_seeding() {
        let params = Params {
            population: 10,
            initial_recovered: 4,
            initial_infectious: 4,
            initial_exposed: 4,
            ..Params::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ModelError::ConfigError(msg) if msg.contains("exceeds population")));
    }

    #[test]
    fn rejects_overflowing_seed_counts() {
        let params = Params {
            population: 10,
            initial_recovered: usize::MAX,
            initial_infectious: 1,
            ..Params::default()
        };
        assert_eq!(params.seeded(), None);
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ModelError::ConfigError(msg) if msg.contains("overflows")));

        let params = Params {
            population: 10,
            initial_recovered: 0,
            initial_infectious: usize::MAX / 2 + 1,
            initial_exposed: usize::MAX / 2 + 1,
            ..Params::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ModelError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_zero_replicates() {
        let params = Params {
            num_simulations: 0,
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(ModelError::ConfigError(_))));
    }

    #[test]
    fn rejects_matrix_band_mismatch() {
        let params = Params {
            contact_matrix: vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            ..Params::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ModelError::ConfigError(msg) if msg.contains("age bands")));
    }

    #[test]
    fn loads_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "population": 40, "time_steps": 12, "profile_padding": "observed_only",
                 "thresholds": {{ "exposure": 0.1, "infectious": 1.0, "recovery": 0.3 }} }}"#
        )
        .unwrap();

        let params = load_params_from_json(file.path()).unwrap();
        assert_eq!(params.population, 40);
        assert_eq!(params.time_steps, 12);
        assert_eq!(params.profile_padding, ProfilePadding::ObservedOnly);
        assert_eq!(params.thresholds.recovery, 0.3);
        // untouched fields keep their defaults
        assert_eq!(params.latent_period, 5);
        assert_eq!(params.age_bands, AgeBands::default_bands());
    }

    #[test]
    fn age_band_weight_is_optional() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "age_bands": [
                     {{ "low": 0, "high": 49, "death_rate": 0.05, "immunosenescence_factor": 0.8 }},
                     {{ "low": 50, "high": 100, "death_rate": 0.1, "immunosenescence_factor": 0.2,
                        "weight": 0.3 }} ],
                 "contact_matrix": [[1.0, 2.0], [2.0, 1.0]] }}"#
        )
        .unwrap();

        let params = load_params_from_json(file.path()).unwrap();
        assert_eq!(params.age_bands[0].weight, 0.1);
        assert_eq!(params.age_bands[1].weight, 0.3);
        let model = params.validate().unwrap();
        assert_eq!(model.age_bands.weights(), vec![0.1, 0.3]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "populaton": 40 }}"#).unwrap();
        assert!(matches!(
            load_params_from_json(file.path()),
            Err(ModelError::JsonError(_))
        ));
    }
}
