pub use crate::age_group::{AgeBand, AgeBands, AgeGroup};
pub use crate::agent::{Agent, AgentId, Compartment};
pub use crate::aggregate::{run_replicates, AggregateResult, Aggregator};
pub use crate::contact_matrix::ContactMatrix;
pub use crate::error::ModelError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{load_params_from_json, Model, Params, ProfilePadding};
pub use crate::population::Population;
pub use crate::random::{RandomStreams, RngId};
pub use crate::report::write_reports;
pub use crate::simulation::{run_replicate, Simulation};
pub use crate::stats::{CompartmentCounts, SimulationRun};
pub use crate::{assert_almost_eq, assert_series_almost_eq, create_report_trait, define_rng};
