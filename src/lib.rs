//! An age-stratified SEIRD agent-based model driven by per-agent viral load.
//!
//! Every agent carries a continuous viral load. Its compartment (Susceptible, Exposed,
//! Infectious, Recovered or Dead) follows from comparing that load against thresholds
//! personal to the agent, and the load itself grows, decays and is passed on through random
//! contacts whose age mixing follows a contact matrix. Older agents clear virus more slowly.
//!
//! A replicate runs a fixed number of daily timesteps. Each timestep consists of:
//! * a local update of every agent in index order (see [`agent`]),
//! * a fixed number of sequential contact trials (see [`transmission`]),
//! * a capture of the per-step statistics (see [`stats`]).
//!
//! Replicates are independent and seeded from a base seed, so [`aggregate`] can run them on
//! worker threads and average their trajectories. The [`report`] module writes the results
//! as CSV files and [`analysis`] derives confidence bands from the replicate curves.
//!
//! ```rust
//! use viral_load_abm::aggregate::run_replicates;
//! use viral_load_abm::parameters::Params;
//!
//! let model = Params {
//!     population: 100,
//!     time_steps: 10,
//!     ..Params::default()
//! }
//! .validate()
//! .unwrap();
//! let result = run_replicates(&model).unwrap();
//! assert_eq!(result.compartment_counts.len(), 11);
//! ```
pub mod age_group;
pub mod agent;
pub mod aggregate;
pub mod analysis;
pub mod contact_matrix;
pub mod error;
pub mod hashing;
pub mod log;
mod macros;
pub mod numeric;
pub mod parameters;
pub mod population;
pub mod prelude;
pub mod random;
pub mod report;
pub mod runner;
pub mod simulation;
pub mod stats;
pub mod transmission;

// Re-exports used by the exported macros.
pub use csv;
pub use paste;
pub use rand;

pub use crate::aggregate::{run_replicates, AggregateResult};
pub use crate::error::ModelError;
pub use crate::parameters::{Model, Params};
pub use crate::simulation::{run_replicate, Simulation};
pub use crate::stats::SimulationRun;
