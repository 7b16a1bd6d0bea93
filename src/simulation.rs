//! The timestep driver for a single replicate.
//!
//! Each timestep runs three phases in order: every agent's local update in index order,
//! the contact phase, and the statistics capture.
use std::time::Instant;

use humantime::format_duration;
use log::{debug, info, trace};

use crate::agent::Compartment;
use crate::define_rng;
use crate::error::ModelError;
use crate::parameters::Model;
use crate::population::Population;
use crate::random::RandomStreams;
use crate::stats::{RunRecorder, SimulationRun};
use crate::transmission::{run_contact_phase, AgeStratifiedSampler, ContactSummary};

define_rng!(pub ProgressionRng);

pub struct Simulation<'a> {
    model: &'a Model,
    streams: RandomStreams,
    population: Population,
    recorder: RunRecorder,
    current_step: usize,
}

impl<'a> Simulation<'a> {
    /// Builds the initial population for a replicate seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Propagates errors from population initialization.
    pub fn new(model: &'a Model, seed: u64) -> Result<Self, ModelError> {
        let mut streams = RandomStreams::new(seed);
        let population = Population::initialize(model, &mut streams)?;
        let recorder = RunRecorder::new(&population, model.params.time_steps);
        Ok(Simulation {
            model,
            streams,
            population,
            recorder,
            current_step: 0,
        })
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Advances the replicate by one timestep.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvariantViolation` if the state captured at the end of the step
    /// is inconsistent.
    pub fn step(&mut self) -> Result<ContactSummary, ModelError> {
        let params = &self.model.params;
        let rng = self.streams.get_rng::<ProgressionRng>();
        for agent in self.population.agents_mut() {
            let band = self.model.age_bands.get(agent.age_group());
            if let Some(transition) = agent.update(params.latent_period, band, rng) {
                trace!(
                    "step {}: {} -> {} (age {})",
                    self.current_step,
                    transition.from,
                    transition.to,
                    agent.age()
                );
                if transition.to == Compartment::Dead {
                    self.recorder.record_death(agent.age_group());
                }
            }
        }

        let mut sampler = AgeStratifiedSampler::new(&self.model.contact_matrix);
        let summary = run_contact_phase(
            &mut self.population,
            &mut sampler,
            &mut self.streams,
            params.contact_trials,
        );

        self.recorder.record_step(&self.population)?;
        self.current_step += 1;
        debug!(
            "step {}: {} transmissions, {} skipped trials",
            self.current_step, summary.transmissions, summary.skipped
        );
        Ok(summary)
    }

    /// Runs every timestep and returns the replicate's statistics.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a step.
    pub fn run(mut self) -> Result<SimulationRun, ModelError> {
        let start = Instant::now();
        while self.current_step < self.model.params.time_steps {
            self.step()?;
        }
        info!(
            "replicate (seed={}) finished {} steps in {}",
            self.streams.base_seed(),
            self.current_step,
            format_duration(start.elapsed())
        );
        Ok(self.recorder.finish(self.population))
    }
}

/// Runs a full replicate with the given seed.
///
/// # Errors
///
/// Propagates any initialization or step error.
pub fn run_replicate(model: &Model, seed: u64) -> Result<SimulationRun, ModelError> {
    Simulation::new(model, seed)?.run()
}
