//! The contact phase of a timestep.
//!
//! After every agent has run its local update, a fixed number of contact trials is drawn.
//! Each trial pairs two agents; when exactly one of them is Infectious and the other is
//! Susceptible or Exposed, the receptive agent takes up a third of the donor's viral load.
//! The donor keeps its own load. The recipient's compartment only changes at its next local
//! update.
//!
//! Trials run strictly in sequence, so the load a recipient gains in one trial is visible to
//! every later trial of the same timestep.
use log::trace;

use crate::agent::{AgentId, Compartment};
use crate::contact_matrix::ContactMatrix;
use crate::define_rng;
use crate::population::Population;
use crate::random::{choose_from_slice, RandomStreams};

define_rng!(pub ContactRng);

/// Draws the two agents of a contact trial.
pub trait ContactSampler {
    /// Returns the pair for the next trial, or `None` when the trial has to be skipped.
    fn draw_pair(
        &mut self,
        population: &Population,
        streams: &mut RandomStreams,
    ) -> Option<(AgentId, AgentId)>;
}

/// Picks the first agent uniformly from the whole population and the second uniformly from
/// an age band drawn from the first agent's row of the contact matrix.
pub struct AgeStratifiedSampler<'a> {
    contact_matrix: &'a ContactMatrix,
}

impl<'a> AgeStratifiedSampler<'a> {
    #[must_use]
    pub fn new(contact_matrix: &'a ContactMatrix) -> Self {
        AgeStratifiedSampler { contact_matrix }
    }
}

impl ContactSampler for AgeStratifiedSampler<'_> {
    fn draw_pair(
        &mut self,
        population: &Population,
        streams: &mut RandomStreams,
    ) -> Option<(AgentId, AgentId)> {
        if population.is_empty() {
            return None;
        }
        let first = AgentId(streams.sample_range(ContactRng, 0..population.len()));
        let source = population.get(first).age_group();
        let u = streams.sample_uniform(ContactRng);
        let partner_group = self.contact_matrix.partner_group(source, u);

        let candidates = population.members(partner_group);
        if candidates.is_empty() {
            trace!("no agents in age band {}, skipping trial", partner_group.index());
            return None;
        }
        let second = *streams.sample(ContactRng, |rng| choose_from_slice(rng, candidates))?;
        Some((first, second))
    }
}

/// Outcome counts of one contact phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactSummary {
    pub trials: usize,
    pub skipped: usize,
    pub transmissions: usize,
}

/// Applies a single contact between `a` and `b`. Returns the viral load transferred, or
/// `None` if the pair is not one Infectious agent with one Susceptible or Exposed agent.
pub fn apply_contact(population: &mut Population, a: AgentId, b: AgentId) -> Option<f64> {
    let first = population.get(a);
    let second = population.get(b);
    let (recipient, donor_load) = match (first.compartment(), second.compartment()) {
        (Compartment::Infectious, other) if other.is_receptive() => (b, first.viral_load()),
        (other, Compartment::Infectious) if other.is_receptive() => (a, second.viral_load()),
        _ => return None,
    };
    let amount = donor_load / 3.0;
    population.get_mut(recipient).receive_viral_load(amount);
    Some(amount)
}

/// Runs `trials` sequential contact trials.
pub fn run_contact_phase<S: ContactSampler>(
    population: &mut Population,
    sampler: &mut S,
    streams: &mut RandomStreams,
    trials: usize,
) -> ContactSummary {
    let mut summary = ContactSummary {
        trials,
        ..ContactSummary::default()
    };
    for _ in 0..trials {
        let Some((a, b)) = sampler.draw_pair(population, streams) else {
            summary.skipped += 1;
            continue;
        };
        if let Some(amount) = apply_contact(population, a, b) {
            trace!("contact {a:?} <-> {b:?} transferred {amount}");
            summary.transmissions += 1;
        }
    }
    summary
}
