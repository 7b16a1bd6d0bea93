//! Per-timestep statistics of a single replicate.
//!
//! A [`RunRecorder`] is created from the initial population, fed once per timestep after the
//! contact phase, and finally turned into a [`SimulationRun`].

// Loss of precision is allowable when converting counts to `f64` in this module.
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::age_group::AgeGroup;
use crate::agent::Compartment;
use crate::error::ModelError;
use crate::numeric::{population_std_dev, trapezoid};
use crate::population::Population;

/// Number of agents in each compartment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompartmentCounts {
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub recovered: usize,
    pub dead: usize,
}

impl CompartmentCounts {
    pub fn add(&mut self, compartment: Compartment) {
        *self.get_mut(compartment) += 1;
    }

    #[must_use]
    pub fn get(&self, compartment: Compartment) -> usize {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Exposed => self.exposed,
            Compartment::Infectious => self.infectious,
            Compartment::Recovered => self.recovered,
            Compartment::Dead => self.dead,
        }
    }

    fn get_mut(&mut self, compartment: Compartment) -> &mut usize {
        match compartment {
            Compartment::Susceptible => &mut self.susceptible,
            Compartment::Exposed => &mut self.exposed,
            Compartment::Infectious => &mut self.infectious,
            Compartment::Recovered => &mut self.recovered,
            Compartment::Dead => &mut self.dead,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.exposed + self.infectious + self.recovered + self.dead
    }

    /// Counts in S, E, I, R, D order.
    #[must_use]
    pub fn as_array(&self) -> [usize; 5] {
        [
            self.susceptible,
            self.exposed,
            self.infectious,
            self.recovered,
            self.dead,
        ]
    }
}

/// Everything one replicate reports.
///
/// Series indexed "by age" are indexed first by age band, then by time. Compartment
/// tallies have `time_steps + 1` entries, the first being the initial population; the
/// viral-load series have one entry per timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub compartment_counts: Vec<CompartmentCounts>,
    pub compartment_counts_by_age: Vec<Vec<CompartmentCounts>>,
    /// Mean load over living agents, 0.0 once every agent is dead.
    pub mean_viral_load: Vec<f64>,
    pub mean_viral_load_by_age: Vec<Vec<f64>>,
    /// Highest load seen in each band over the whole run.
    pub max_viral_load_by_age: Vec<f64>,
    pub max_viral_load_trajectory: Vec<Vec<f64>>,
    pub area_under_curve_by_age: Vec<f64>,
    /// Population standard deviation of the band maxima at each timestep.
    pub max_viral_load_dispersion: Vec<f64>,
    pub final_max_viral_load_dispersion: f64,
    pub people_by_age: Vec<usize>,
    pub deaths_by_age: Vec<usize>,
    /// Per agent in index order, its load at the end of each timestep.
    pub agent_viral_loads: Vec<Vec<f64>>,
    /// Per band, the viral-load history of each member in index order.
    pub histories_by_age: Vec<Vec<Vec<f64>>>,
}

pub struct RunRecorder {
    compartment_counts: Vec<CompartmentCounts>,
    compartment_counts_by_age: Vec<Vec<CompartmentCounts>>,
    mean_viral_load: Vec<f64>,
    mean_viral_load_by_age: Vec<Vec<f64>>,
    running_max: Vec<f64>,
    max_viral_load_trajectory: Vec<Vec<f64>>,
    max_viral_load_dispersion: Vec<f64>,
    agent_viral_loads: Vec<Vec<f64>>,
    deaths_by_age: Vec<usize>,
}

impl RunRecorder {
    /// Starts a recorder, tallying the initial population as entry 0 of the compartment
    /// series.
    #[must_use]
    pub fn new(population: &Population, time_steps: usize) -> Self {
        let bands = population.age_group_count();
        let mut recorder = RunRecorder {
            compartment_counts: Vec::with_capacity(time_steps + 1),
            compartment_counts_by_age: vec![Vec::with_capacity(time_steps + 1); bands],
            mean_viral_load: Vec::with_capacity(time_steps),
            mean_viral_load_by_age: vec![Vec::with_capacity(time_steps); bands],
            running_max: vec![0.0; bands],
            max_viral_load_trajectory: vec![Vec::with_capacity(time_steps); bands],
            max_viral_load_dispersion: Vec::with_capacity(time_steps),
            agent_viral_loads: vec![Vec::with_capacity(time_steps); population.len()],
            deaths_by_age: vec![0; bands],
        };
        recorder.tally_compartments(population);
        recorder
    }

    pub fn record_death(&mut self, group: AgeGroup) {
        self.deaths_by_age[group.index()] += 1;
    }

    /// Captures the state at the end of a timestep.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvariantViolation` if an agent holds a negative or non-finite
    /// viral load.
    pub fn record_step(&mut self, population: &Population) -> Result<(), ModelError> {
        let bands = self.running_max.len();
        let mut living_total = 0.0;
        let mut living_count = 0usize;
        let mut band_totals = vec![0.0; bands];
        let mut band_living = vec![0usize; bands];

        for (i, agent) in population.agents().iter().enumerate() {
            let load = agent.viral_load();
            if !load.is_finite() || load < 0.0 {
                return Err(ModelError::InvariantViolation(format!(
                    "agent {i} has viral load {load}"
                )));
            }
            self.agent_viral_loads[i].push(load);

            let band = agent.age_group().index();
            if load > self.running_max[band] {
                self.running_max[band] = load;
            }
            if agent.compartment() != Compartment::Dead {
                living_total += load;
                living_count += 1;
                band_totals[band] += load;
                band_living[band] += 1;
            }
        }

        self.mean_viral_load.push(if living_count == 0 {
            0.0
        } else {
            living_total / living_count as f64
        });
        for band in 0..bands {
            let mean = if band_living[band] == 0 {
                0.0
            } else {
                band_totals[band] / band_living[band] as f64
            };
            self.mean_viral_load_by_age[band].push(mean);
            self.max_viral_load_trajectory[band].push(self.running_max[band]);
        }
        self.max_viral_load_dispersion
            .push(population_std_dev(&self.running_max));
        self.tally_compartments(population);
        Ok(())
    }

    fn tally_compartments(&mut self, population: &Population) {
        let mut overall = CompartmentCounts::default();
        let mut by_age = vec![CompartmentCounts::default(); self.running_max.len()];
        for agent in population.agents() {
            overall.add(agent.compartment());
            by_age[agent.age_group().index()].add(agent.compartment());
        }
        self.compartment_counts.push(overall);
        for (series, counts) in self.compartment_counts_by_age.iter_mut().zip(by_age) {
            series.push(counts);
        }
    }

    /// Closes the run, collecting the agents' viral-load histories by band.
    #[must_use]
    pub fn finish(self, population: Population) -> SimulationRun {
        let people_by_age = population.people_by_age();
        let mut histories_by_age = vec![Vec::new(); people_by_age.len()];
        for mut agent in population.into_agents() {
            histories_by_age[agent.age_group().index()].push(agent.take_viral_load_history());
        }

        let area_under_curve_by_age = self
            .mean_viral_load_by_age
            .iter()
            .map(|curve| trapezoid(curve))
            .collect();
        let final_max_viral_load_dispersion =
            self.max_viral_load_dispersion.last().copied().unwrap_or(0.0);

        SimulationRun {
            compartment_counts: self.compartment_counts,
            compartment_counts_by_age: self.compartment_counts_by_age,
            mean_viral_load: self.mean_viral_load,
            mean_viral_load_by_age: self.mean_viral_load_by_age,
            max_viral_load_by_age: self.running_max,
            max_viral_load_trajectory: self.max_viral_load_trajectory,
            area_under_curve_by_age,
            max_viral_load_dispersion: self.max_viral_load_dispersion,
            final_max_viral_load_dispersion,
            people_by_age,
            deaths_by_age: self.deaths_by_age,
            agent_viral_loads: self.agent_viral_loads,
            histories_by_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age_group::{AgeBand, AgeBands};
    use crate::agent::{Agent, AgentId, Thresholds};
    use crate::assert_almost_eq;
    use crate::numeric::ACC;
    use crate::parameters::BaseThresholds;

    fn bands() -> AgeBands {
        AgeBands::new(vec![
            AgeBand::new(0, 49, 0.0, 0.5),
            AgeBand::new(50, 100, 0.0, 0.5),
        ])
        .unwrap()
    }

    fn agent(compartment: Compartment, viral_load: f64, group: usize) -> Agent {
        let thresholds: Thresholds = BaseThresholds::default().into();
        Agent::new(
            compartment,
            viral_load,
            if group == 0 { 20 } else { 60 },
            AgeGroup(group),
            thresholds,
        )
    }

    #[test]
    fn counts_by_compartment() {
        let mut counts = CompartmentCounts::default();
        counts.add(Compartment::Infectious);
        counts.add(Compartment::Infectious);
        counts.add(Compartment::Dead);
        assert_eq!(counts.get(Compartment::Infectious), 2);
        assert_eq!(counts.as_array(), [0, 0, 2, 0, 1]);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn initial_tally_is_entry_zero() {
        let population = Population::from_agents(
            vec![
                agent(Compartment::Infectious, 0.5, 0),
                agent(Compartment::Susceptible, 0.0, 1),
                agent(Compartment::Recovered, 0.0, 1),
            ],
            &bands(),
        )
        .unwrap();
        let run = RunRecorder::new(&population, 0).finish(population);

        assert_eq!(run.compartment_counts.len(), 1);
        assert_eq!(run.compartment_counts[0].as_array(), [1, 0, 1, 1, 0]);
        assert_eq!(run.compartment_counts_by_age[1][0].as_array(), [1, 0, 0, 1, 0]);
        assert!(run.mean_viral_load.is_empty());
        assert_eq!(run.final_max_viral_load_dispersion, 0.0);
        assert_eq!(run.people_by_age, vec![1, 2]);
    }

    #[test]
    fn means_exclude_the_dead() {
        let population = Population::from_agents(
            vec![
                agent(Compartment::Infectious, 0.6, 0),
                agent(Compartment::Exposed, 0.2, 0),
                agent(Compartment::Dead, 0.0, 1),
            ],
            &bands(),
        )
        .unwrap();
        let mut recorder = RunRecorder::new(&population, 1);
        recorder.record_step(&population).unwrap();
        let run = recorder.finish(population);

        assert_almost_eq!(run.mean_viral_load[0], 0.4, ACC);
        assert_almost_eq!(run.mean_viral_load_by_age[0][0], 0.4, ACC);
        // band 1 has no living members
        assert_eq!(run.mean_viral_load_by_age[1][0], 0.0);
    }

    #[test]
    fn all_dead_gives_zero_mean() {
        let population =
            Population::from_agents(vec![agent(Compartment::Dead, 0.0, 0)], &bands()).unwrap();
        let mut recorder = RunRecorder::new(&population, 1);
        recorder.record_step(&population).unwrap();
        assert_eq!(recorder.finish(population).mean_viral_load, vec![0.0]);
    }

    #[test]
    fn maxima_never_decrease_and_disperse() {
        let mut population = Population::from_agents(
            vec![
                agent(Compartment::Infectious, 0.8, 0),
                agent(Compartment::Infectious, 0.2, 1),
            ],
            &bands(),
        )
        .unwrap();
        let mut recorder = RunRecorder::new(&population, 2);
        recorder.record_step(&population).unwrap();
        // loads fall, maxima must hold
        *population.get_mut(AgentId(0)) = agent(Compartment::Infectious, 0.1, 0);
        population.get_mut(AgentId(1)).receive_viral_load(0.2);
        recorder.record_step(&population).unwrap();
        let run = recorder.finish(population);

        assert_eq!(run.max_viral_load_trajectory[0], vec![0.8, 0.8]);
        assert_eq!(run.max_viral_load_trajectory[1], vec![0.2, 0.4]);
        assert_eq!(run.max_viral_load_by_age, vec![0.8, 0.4]);
        assert_almost_eq!(run.max_viral_load_dispersion[0], 0.3, ACC);
        assert_almost_eq!(run.final_max_viral_load_dispersion, 0.2, ACC);
        assert_eq!(run.agent_viral_loads[0], vec![0.8, 0.1]);
        assert_almost_eq!(run.area_under_curve_by_age[0], (0.8 + 0.1) / 2.0, ACC);
    }

    #[test]
    fn deaths_are_tallied_by_band() {
        let population =
            Population::from_agents(vec![agent(Compartment::Dead, 0.0, 1)], &bands()).unwrap();
        let mut recorder = RunRecorder::new(&population, 0);
        recorder.record_death(AgeGroup(1));
        assert_eq!(recorder.finish(population).deaths_by_age, vec![0, 1]);
    }
}
