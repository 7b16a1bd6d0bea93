//! The agent arena and the initial population.
//!
//! Agents are stored in index order (the order in which they were seeded) and addressed by
//! [`AgentId`]. Alongside the arena the population keeps an index from age band to the agents
//! in it, which the contact phase uses to pick partners without scanning the population.
use log::debug;

use crate::age_group::{AgeBands, AgeGroup};
use crate::agent::{Agent, AgentId, Compartment, Thresholds};
use crate::error::ModelError;
use crate::parameters::Model;
use crate::rand::distr::weighted::WeightedIndex;
use crate::random::RandomStreams;
use crate::define_rng;

define_rng!(pub PopulationRng);

#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
    by_age_group: Vec<Vec<AgentId>>,
}

impl Population {
    /// Builds the initial population.
    ///
    /// Compartments are assigned by index: the first `initial_recovered` agents are Recovered,
    /// the next `initial_infectious` Infectious (load midway between the infectious and
    /// recovery base thresholds), the next `initial_exposed` Exposed (load midway between the
    /// exposure and infectious base thresholds), and the rest Susceptible. Each age is drawn
    /// independently: a band by weight, then an age uniformly within the band.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` if the seed counts overflow or the band weights cannot
    /// form a distribution, and `ModelError::InvariantViolation` if a drawn age cannot be
    /// classified.
    pub fn initialize(model: &Model, streams: &mut RandomStreams) -> Result<Self, ModelError> {
        let params = &model.params;
        let base = params.thresholds;
        let band_distribution = WeightedIndex::new(model.age_bands.weights())
            .map_err(|e| ModelError::ConfigError(format!("invalid age band weights: {e}")))?;

        let overflow = || {
            ModelError::ConfigError(
                "initial recovered + infectious + exposed overflows the agent count".into(),
            )
        };
        let infectious_end = params
            .initial_recovered
            .checked_add(params.initial_infectious)
            .ok_or_else(overflow)?;
        let exposed_end = infectious_end
            .checked_add(params.initial_exposed)
            .ok_or_else(overflow)?;

        let mut agents = Vec::with_capacity(params.population);
        for i in 0..params.population {
            let (compartment, viral_load) = if i < params.initial_recovered {
                (Compartment::Recovered, 0.0)
            } else if i < infectious_end {
                (
                    Compartment::Infectious,
                    (base.infectious + base.recovery) / 2.0,
                )
            } else if i < exposed_end {
                (Compartment::Exposed, (base.exposure + base.infectious) / 2.0)
            } else {
                (Compartment::Susceptible, 0.0)
            };

            let band = model.age_bands.get(AgeGroup(
                streams.sample_distr(PopulationRng, &band_distribution),
            ));
            let age = streams.sample_range(PopulationRng, band.low..=band.high);
            let age_group = model.age_bands.classify(age)?;
            let thresholds = streams.sample(PopulationRng, |rng| Thresholds::jittered(&base, rng));

            agents.push(Agent::new(
                compartment,
                viral_load,
                age,
                age_group,
                thresholds,
            ));
        }

        let population = Population::from_agents(agents, &model.age_bands)?;
        debug!(
            "initialized {} agents, by age band: {:?}",
            population.len(),
            population.people_by_age()
        );
        Ok(population)
    }

    /// Wraps existing agents, building the age-band index.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvariantViolation` if an agent's band is not one of `age_bands`.
    pub fn from_agents(agents: Vec<Agent>, age_bands: &AgeBands) -> Result<Self, ModelError> {
        let mut by_age_group = vec![Vec::new(); age_bands.len()];
        for (i, agent) in agents.iter().enumerate() {
            let members = by_age_group.get_mut(agent.age_group().index()).ok_or_else(|| {
                ModelError::InvariantViolation(format!(
                    "agent {i} belongs to age band {} but only {} bands exist",
                    agent.age_group().index(),
                    age_bands.len()
                ))
            })?;
            members.push(AgentId(i));
        }
        Ok(Population {
            agents,
            by_age_group,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> &Agent {
        &self.agents[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id.0]
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Consumes the population, returning the agents in index order.
    #[must_use]
    pub fn into_agents(self) -> Vec<Agent> {
        self.agents
    }

    /// The agents belonging to `group`, in index order.
    #[must_use]
    pub fn members(&self, group: AgeGroup) -> &[AgentId] {
        self.by_age_group
            .get(group.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn age_group_count(&self) -> usize {
        self.by_age_group.len()
    }

    #[must_use]
    pub fn people_by_age(&self) -> Vec<usize> {
        self.by_age_group.iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn count(&self, compartment: Compartment) -> usize {
        self.agents
            .iter()
            .filter(|a| a.compartment() == compartment)
            .count()
    }
}
