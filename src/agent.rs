//! Agents and their local (within-host) state machine.
//!
//! An agent's compartment is driven by a continuous viral load compared against thresholds
//! personal to the agent. The local update in this module only looks at the agent itself;
//! viral load arrives from other agents during the contact phase (see
//! [`crate::transmission`]) and takes effect at the recipient's next local update.
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter};

use crate::age_group::{AgeBand, AgeGroup};
use crate::parameters::BaseThresholds;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
    Dead,
}

impl Compartment {
    /// Position of this compartment in S, E, I, R, D order.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether an agent in this compartment can take up viral load from an Infectious contact.
    #[must_use]
    pub fn is_receptive(self) -> bool {
        matches!(self, Compartment::Susceptible | Compartment::Exposed)
    }
}

/// Index of an agent in its population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

/// An agent's personal thresholds, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub exposure: f64,
    pub infectious: f64,
    pub recovery: f64,
}

impl Thresholds {
    /// Jitters each base value uniformly by up to ±50%.
    pub fn jittered<R: Rng>(base: &BaseThresholds, rng: &mut R) -> Self {
        let mut jitter = |value: f64| value + (rng.random::<f64>() - 0.5) * value;
        Thresholds {
            exposure: jitter(base.exposure),
            infectious: jitter(base.infectious),
            recovery: jitter(base.recovery),
        }
    }
}

impl From<BaseThresholds> for Thresholds {
    fn from(base: BaseThresholds) -> Self {
        Thresholds {
            exposure: base.exposure,
            infectious: base.infectious,
            recovery: base.recovery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Compartment,
    pub to: Compartment,
}

#[derive(Debug, Clone)]
pub struct Agent {
    compartment: Compartment,
    viral_load: f64,
    days_in_compartment: u32,
    age: u32,
    age_group: AgeGroup,
    thresholds: Thresholds,
    is_dead: bool,
    viral_load_history: Vec<f64>,
}

impl Agent {
    #[must_use]
    pub fn new(
        compartment: Compartment,
        viral_load: f64,
        age: u32,
        age_group: AgeGroup,
        thresholds: Thresholds,
    ) -> Self {
        Agent {
            compartment,
            viral_load: viral_load.max(0.0),
            days_in_compartment: 0,
            age,
            age_group,
            thresholds,
            is_dead: compartment == Compartment::Dead,
            viral_load_history: Vec::new(),
        }
    }

    #[must_use]
    pub fn compartment(&self) -> Compartment {
        self.compartment
    }

    #[must_use]
    pub fn viral_load(&self) -> f64 {
        self.viral_load
    }

    #[must_use]
    pub fn days_in_compartment(&self) -> u32 {
        self.days_in_compartment
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Every positive viral load this agent has held after a local update, in order.
    #[must_use]
    pub fn viral_load_history(&self) -> &[f64] {
        &self.viral_load_history
    }

    pub fn take_viral_load_history(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.viral_load_history)
    }

    /// Adds viral load received from a contact. Only the contact phase calls this.
    pub(crate) fn receive_viral_load(&mut self, amount: f64) {
        self.viral_load += amount;
    }

    #[cfg(test)]
    pub(crate) fn set_days_in_compartment(&mut self, days: u32) {
        self.days_in_compartment = days;
    }

    fn move_to(&mut self, compartment: Compartment) {
        self.compartment = compartment;
        self.days_in_compartment = 0;
    }

    fn decay(&mut self, amount: f64) {
        self.viral_load = (self.viral_load - amount).max(0.0);
    }

    /// Advances the agent by one timestep using only its own state.
    ///
    /// Within the Infectious compartment the death roll happens before the recovery check, and
    /// death wins over a same-step recovery. Returns the transition taken, if any.
    pub fn update<R: Rng>(
        &mut self,
        latent_period: u32,
        band: &AgeBand,
        rng: &mut R,
    ) -> Option<Transition> {
        let from = self.compartment;
        match self.compartment {
            Compartment::Susceptible => {
                self.days_in_compartment += 1;
                if self.viral_load > self.thresholds.exposure {
                    self.move_to(Compartment::Exposed);
                }
            }
            Compartment::Exposed => {
                self.days_in_compartment += 1;
                self.viral_load += rng.random::<f64>() / 3.0;
                if self.days_in_compartment < latent_period
                    && self.viral_load > self.thresholds.infectious
                {
                    self.move_to(Compartment::Infectious);
                } else if self.days_in_compartment >= latent_period {
                    self.move_to(Compartment::Recovered);
                }
            }
            Compartment::Infectious => {
                self.days_in_compartment += 1;
                self.decay(rng.random::<f64>() * band.immunosenescence_factor);
                if rng.random::<f64>() < band.death_rate {
                    self.is_dead = true;
                }
                if self.is_dead {
                    self.move_to(Compartment::Dead);
                } else if self.viral_load <= self.thresholds.recovery {
                    self.move_to(Compartment::Recovered);
                }
            }
            // Reinfection is disabled: Recovered agents only shed their remaining load.
            Compartment::Recovered => {
                self.days_in_compartment += 1;
                self.decay(rng.random::<f64>() * band.immunosenescence_factor / 3.0);
            }
            Compartment::Dead => {
                self.viral_load = 0.0;
            }
        }

        if self.viral_load > 0.0 {
            self.viral_load_history.push(self.viral_load);
        }

        (self.compartment != from).then_some(Transition {
            from,
            to: self.compartment,
        })
    }
}
