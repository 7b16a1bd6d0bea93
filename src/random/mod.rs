//! Independent, reproducible random number streams.
//!
//! Every source of randomness in the model draws from a named stream. Streams are keyed by a
//! zero-sized type declared with [`define_rng!`], and each is seeded from the replicate's base
//! seed plus a stable hash of the stream's name. Adding draws to one stream therefore never
//! perturbs another, and two replicates with the same base seed are identical.
mod macros;
mod sampling_algorithms;

use std::any::{Any, TypeId};

use log::trace;

pub use macros::define_rng;
pub use sampling_algorithms::{choose_from_slice, first_exceedance};

use crate::hashing::{hash_str, HashMap};
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng + Rng + 'static;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}

/// The set of random streams owned by one replicate. Rngs are created lazily the first
/// time a stream is used.
pub struct RandomStreams {
    base_seed: u64,
    rng_holders: HashMap<TypeId, RngHolder>,
}

impl RandomStreams {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random streams (seed={base_seed})");
        RandomStreams {
            base_seed,
            rng_holders: HashMap::default(),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Gets a mutable reference to the random number generator associated with the given
    /// [`RngId`]. If the Rng has not been used before, one will be created from the base seed.
    #[allow(clippy::missing_panics_doc)]
    pub fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_holders
            .entry(TypeId::of::<R>())
            // Create a new rng holder if it doesn't exist yet
            .or_insert_with(|| {
                trace!("creating new RNG {} (seed={base_seed})", R::get_name());
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            // Holders are keyed by the `TypeId` of `R`, so the stored type is always `R::RngType`.
            .expect("rng holder type does not match its RngId")
    }

    /// Applies `sampler` to the generator associated with the given [`RngId`].
    pub fn sample<R: RngId, T>(
        &mut self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        sampler(self.get_rng::<R>())
    }

    /// Draws from `distribution` using the generator associated with the given [`RngId`].
    pub fn sample_distr<R: RngId, T>(&mut self, rng_id: R, distribution: &impl Distribution<T>) -> T {
        self.sample(rng_id, |rng| distribution.sample(rng))
    }

    /// Gets a random sample within the range provided by `range`.
    pub fn sample_range<R: RngId, S, T>(&mut self, rng_id: R, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    /// A standard uniform draw on `[0, 1)`.
    pub fn sample_uniform<R: RngId>(&mut self, rng_id: R) -> f64 {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::distr::weighted::WeightedIndex;
    use crate::rand::RngCore;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut streams = RandomStreams::new(42);
        let foo_rng = streams.get_rng::<FooRng>();
        assert_ne!(foo_rng.next_u64(), foo_rng.next_u64());
    }

    #[test]
    fn streams_are_independent() {
        let mut streams = RandomStreams::new(42);
        let foo = streams.get_rng::<FooRng>().next_u64();

        // Drawing from `BarRng` first must not change what `FooRng` yields.
        let mut other = RandomStreams::new(42);
        other.get_rng::<BarRng>().next_u64();
        assert_eq!(other.get_rng::<FooRng>().next_u64(), foo);
        assert_ne!(other.get_rng::<BarRng>().next_u64(), foo);
    }

    #[test]
    fn base_seed_determines_draws() {
        let mut streams = RandomStreams::new(42);
        let run_0 = streams.sample_range(FooRng, 0..1_000_000u32);
        let run_1 = streams.sample_range(FooRng, 0..1_000_000u32);

        // Same seed, same values
        let mut same = RandomStreams::new(42);
        assert_eq!(run_0, same.sample_range(FooRng, 0..1_000_000u32));
        assert_eq!(run_1, same.sample_range(FooRng, 0..1_000_000u32));

        // Different seed, different values
        let mut other = RandomStreams::new(88);
        assert_eq!(other.base_seed(), 88);
        assert_ne!(run_0, other.sample_range(FooRng, 0..1_000_000u32));
    }

    #[test]
    fn uniform_draws_are_in_unit_interval() {
        let mut streams = RandomStreams::new(7);
        for _ in 0..1000 {
            let u = streams.sample_uniform(FooRng);
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn sample_distr_weighted() {
        let mut streams = RandomStreams::new(42);
        let weights = WeightedIndex::new([0.0, 1.0, 0.0]).unwrap();
        for _ in 0..100 {
            assert_eq!(streams.sample_distr(FooRng, &weights), 1);
        }
    }
}
