//! Running replicates and combining them.
//!
//! Replicate `r` is seeded with `seed + r` and owns all of its random streams, so replicates
//! can run on any number of worker threads. Results are always folded into the
//! [`Aggregator`] in replicate order, which makes the aggregate independent of the thread
//! count.

// Loss of precision is allowable when converting counts to `f64` in this module.
#![allow(clippy::cast_precision_loss)]

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{error, info};

use crate::error::ModelError;
use crate::parameters::{Model, ProfilePadding};
use crate::simulation::run_replicate;
use crate::stats::{CompartmentCounts, SimulationRun};

/// The combined output of every replicate.
///
/// Means are element-wise over replicates. Counts summed over replicates say so.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Mean S, E, I, R, D counts, `time_steps + 1` entries.
    pub compartment_counts: Vec<[f64; 5]>,
    pub compartment_counts_by_age: Vec<Vec<[f64; 5]>>,
    pub mean_viral_load: Vec<f64>,
    pub mean_viral_load_by_age: Vec<Vec<f64>>,
    /// Per band, per replicate, the band's mean viral-load curve.
    pub replicate_viral_load_by_age: Vec<Vec<Vec<f64>>>,
    /// Per band, the element-wise mean of every member's viral-load history.
    pub viral_load_profiles: Vec<Vec<f64>>,
    pub agent_viral_loads: Vec<Vec<f64>>,
    /// Summed over replicates.
    pub people_by_age: Vec<usize>,
    /// Summed over replicates.
    pub deaths_by_age: Vec<usize>,
    pub max_viral_load_by_age: Vec<f64>,
    pub area_under_curve_by_age: Vec<f64>,
    pub replicates: usize,
}

/// Accumulates replicates one at a time.
pub struct Aggregator {
    padding: ProfilePadding,
    compartment_counts: Vec<[f64; 5]>,
    compartment_counts_by_age: Vec<Vec<[f64; 5]>>,
    mean_viral_load: Vec<f64>,
    mean_viral_load_by_age: Vec<Vec<f64>>,
    replicate_viral_load_by_age: Vec<Vec<Vec<f64>>>,
    histories_by_age: Vec<Vec<Vec<f64>>>,
    agent_viral_loads: Vec<Vec<f64>>,
    people_by_age: Vec<usize>,
    deaths_by_age: Vec<usize>,
    max_viral_load_by_age: Vec<f64>,
    area_under_curve_by_age: Vec<f64>,
    replicates: usize,
}

fn add_into(total: &mut [f64], values: &[f64]) {
    for (t, v) in total.iter_mut().zip(values) {
        *t += v;
    }
}

fn add_counts_into(total: &mut [[f64; 5]], counts: &[CompartmentCounts]) {
    for (t, c) in total.iter_mut().zip(counts) {
        for (slot, n) in t.iter_mut().zip(c.as_array()) {
            *slot += n as f64;
        }
    }
}

fn shape_mismatch(what: &str, expected: usize, found: usize) -> ModelError {
    ModelError::InvariantViolation(format!(
        "replicate {what} has {found} entries, expected {expected}"
    ))
}

impl Aggregator {
    #[must_use]
    pub fn new(model: &Model) -> Self {
        let bands = model.age_bands.len();
        let steps = model.params.time_steps;
        let population = model.params.population;
        Aggregator {
            padding: model.params.profile_padding,
            compartment_counts: vec![[0.0; 5]; steps + 1],
            compartment_counts_by_age: vec![vec![[0.0; 5]; steps + 1]; bands],
            mean_viral_load: vec![0.0; steps],
            mean_viral_load_by_age: vec![vec![0.0; steps]; bands],
            replicate_viral_load_by_age: vec![Vec::new(); bands],
            histories_by_age: vec![Vec::new(); bands],
            agent_viral_loads: vec![vec![0.0; steps]; population],
            people_by_age: vec![0; bands],
            deaths_by_age: vec![0; bands],
            max_viral_load_by_age: vec![0.0; bands],
            area_under_curve_by_age: vec![0.0; bands],
            replicates: 0,
        }
    }

    /// Folds one replicate into the running totals.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvariantViolation` if the run's series do not have the shape
    /// this aggregator was built for.
    pub fn add_run(&mut self, run: SimulationRun) -> Result<(), ModelError> {
        let bands = self.people_by_age.len();
        if run.people_by_age.len() != bands || run.mean_viral_load_by_age.len() != bands {
            return Err(shape_mismatch("age band list", bands, run.people_by_age.len()));
        }
        if run.compartment_counts.len() != self.compartment_counts.len() {
            return Err(shape_mismatch(
                "compartment series",
                self.compartment_counts.len(),
                run.compartment_counts.len(),
            ));
        }
        if run.mean_viral_load.len() != self.mean_viral_load.len() {
            return Err(shape_mismatch(
                "viral load series",
                self.mean_viral_load.len(),
                run.mean_viral_load.len(),
            ));
        }
        if run.agent_viral_loads.len() != self.agent_viral_loads.len() {
            return Err(shape_mismatch(
                "agent list",
                self.agent_viral_loads.len(),
                run.agent_viral_loads.len(),
            ));
        }

        add_counts_into(&mut self.compartment_counts, &run.compartment_counts);
        for (total, counts) in self
            .compartment_counts_by_age
            .iter_mut()
            .zip(&run.compartment_counts_by_age)
        {
            add_counts_into(total, counts);
        }
        add_into(&mut self.mean_viral_load, &run.mean_viral_load);
        for band in 0..bands {
            add_into(
                &mut self.mean_viral_load_by_age[band],
                &run.mean_viral_load_by_age[band],
            );
            self.people_by_age[band] += run.people_by_age[band];
            self.deaths_by_age[band] += run.deaths_by_age[band];
            self.max_viral_load_by_age[band] += run.max_viral_load_by_age[band];
            self.area_under_curve_by_age[band] += run.area_under_curve_by_age[band];
        }
        for (total, loads) in self.agent_viral_loads.iter_mut().zip(&run.agent_viral_loads) {
            add_into(total, loads);
        }
        for (replicate_curves, curve) in self
            .replicate_viral_load_by_age
            .iter_mut()
            .zip(run.mean_viral_load_by_age)
        {
            replicate_curves.push(curve);
        }
        for (histories, band_histories) in
            self.histories_by_age.iter_mut().zip(run.histories_by_age)
        {
            histories.extend(band_histories);
        }
        self.replicates += 1;
        Ok(())
    }

    #[must_use]
    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Divides the running totals by the replicate count and builds the profiles.
    #[must_use]
    pub fn finish(self) -> AggregateResult {
        let n = self.replicates.max(1) as f64;
        let scale = |values: Vec<f64>| values.into_iter().map(|v| v / n).collect::<Vec<_>>();
        let scale_counts = |values: Vec<[f64; 5]>| {
            values
                .into_iter()
                .map(|c| c.map(|v| v / n))
                .collect::<Vec<_>>()
        };

        let viral_load_profiles = self
            .histories_by_age
            .iter()
            .map(|histories| viral_load_profile(histories, self.padding))
            .collect();

        AggregateResult {
            compartment_counts: scale_counts(self.compartment_counts),
            compartment_counts_by_age: self
                .compartment_counts_by_age
                .into_iter()
                .map(scale_counts)
                .collect(),
            mean_viral_load: scale(self.mean_viral_load),
            mean_viral_load_by_age: self.mean_viral_load_by_age.into_iter().map(scale).collect(),
            replicate_viral_load_by_age: self.replicate_viral_load_by_age,
            viral_load_profiles,
            agent_viral_loads: self.agent_viral_loads.into_iter().map(scale).collect(),
            people_by_age: self.people_by_age,
            deaths_by_age: self.deaths_by_age,
            max_viral_load_by_age: scale(self.max_viral_load_by_age),
            area_under_curve_by_age: scale(self.area_under_curve_by_age),
            replicates: self.replicates,
        }
    }
}

/// Averages ragged viral-load histories position by position.
///
/// The profile is as long as the longest history. With [`ProfilePadding::ZeroFill`] a
/// history that has ended counts as a zero reading; with [`ProfilePadding::ObservedOnly`]
/// it is left out of the positions it does not reach. No histories give an empty profile.
#[must_use]
pub fn viral_load_profile(histories: &[Vec<f64>], padding: ProfilePadding) -> Vec<f64> {
    let length = histories.iter().map(Vec::len).max().unwrap_or(0);
    (0..length)
        .map(|position| {
            let readings = histories.iter().filter_map(|h| h.get(position));
            let (sum, observed) = readings.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            let divisor = match padding {
                ProfilePadding::ZeroFill => histories.len(),
                ProfilePadding::ObservedOnly => observed,
            };
            sum / divisor as f64
        })
        .collect()
}

/// Runs `task` for replicates `0..replicates` on `threads` scoped workers and returns the
/// results in replicate order.
///
/// Once a replicate fails, workers skip the replicates numbered above it but still run every
/// lower one, so the lowest-numbered failure is always present whatever the thread count.
fn run_on_workers<T, F>(
    replicates: usize,
    threads: usize,
    task: F,
) -> Vec<(usize, Result<T, ModelError>)>
where
    T: Send,
    F: Fn(usize) -> Result<T, ModelError> + Sync,
{
    let threads = threads.clamp(1, replicates.max(1));
    let lowest_failed = AtomicUsize::new(usize::MAX);
    let mut results: Vec<(usize, Result<T, ModelError>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let lowest_failed = &lowest_failed;
                let task = &task;
                scope.spawn(move || {
                    let mut finished = Vec::new();
                    for replicate in (worker..replicates).step_by(threads) {
                        if replicate > lowest_failed.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = task(replicate);
                        if result.is_err() {
                            lowest_failed.fetch_min(replicate, Ordering::Relaxed);
                        }
                        finished.push((replicate, result));
                    }
                    finished
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(finished) => finished,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    });
    results.sort_by_key(|(replicate, _)| *replicate);
    results
}

/// Runs every replicate of `model` and aggregates them.
///
/// # Errors
///
/// If any replicate fails, returns `ModelError::ReplicateFailed` for the lowest-numbered
/// failing replicate. No partial aggregate is produced.
pub fn run_replicates(model: &Model) -> Result<AggregateResult, ModelError> {
    let replicates = model.params.num_simulations;
    let threads = model.params.threads.clamp(1, replicates.max(1));
    let base_seed = model.params.seed;
    info!("running {replicates} replicates on {threads} threads (seed={base_seed})");

    let results = run_on_workers(replicates, threads, |replicate| {
        run_replicate(model, base_seed.wrapping_add(replicate as u64))
    });

    let mut aggregator = Aggregator::new(model);
    for (replicate, result) in results {
        let folded = result.and_then(|run| aggregator.add_run(run));
        if let Err(source) = folded {
            error!("replicate {replicate} failed: {source}");
            return Err(ModelError::ReplicateFailed {
                replicate,
                source: Box::new(source),
            });
        }
    }
    info!("aggregated {} replicates", aggregator.replicates());
    Ok(aggregator.finish())
}
