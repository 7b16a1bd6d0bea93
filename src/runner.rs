use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};

use crate::aggregate::{run_replicates, AggregateResult};
use crate::error::ModelError;
use crate::log::{apply_log_spec, info, LogSpec};
use crate::parameters::{load_params_from_json, Model, Params};
use crate::report::write_reports;

/// Default cli arguments for the viral-load runner
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BaseArgs {
    /// Base random seed; replicate r runs with seed + r. Overrides the config file.
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a parameters config file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Directory the CSV reports are written to
    #[arg(short, long, default_value = "output")]
    pub output_dir: String,

    /// Log level, optionally per module, e.g. `info` or
    /// `viral_load_abm::transmission=trace,info`. Logging is off by default.
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Number of replicates. Overrides the config file.
    #[arg(long)]
    pub replicates: Option<usize>,

    /// Worker threads used to run replicates. Overrides the config file.
    #[arg(short, long)]
    pub threads: Option<usize>,
}

impl Default for BaseArgs {
    fn default() -> Self {
        BaseArgs {
            random_seed: None,
            config: String::new(),
            output_dir: "output".to_string(),
            log_level: None,
            replicates: None,
            threads: None,
        }
    }
}

fn create_cli() -> Command {
    let cli = Command::new("viral_load").about("Age-stratified viral-load SEIRD model");
    BaseArgs::augment_args(cli)
}

/// Parses the command line and runs every replicate, writing the reports.
///
/// # Errors
/// Returns an error if argument parsing, configuration, a replicate or report output fails
pub fn run_with_args() -> Result<AggregateResult, Box<dyn std::error::Error>> {
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(&args)?)
}

/// Builds the validated model described by `args`: parameters from the config file if one is
/// given, then command-line overrides.
///
/// # Errors
/// Returns an error if the config file cannot be read or the parameters are invalid
pub fn build_model(args: &BaseArgs) -> Result<Model, ModelError> {
    let mut params = if args.config.is_empty() {
        Params::default()
    } else {
        load_params_from_json(Path::new(&args.config))?
    };
    if let Some(seed) = args.random_seed {
        params.seed = seed;
    }
    if let Some(replicates) = args.replicates {
        params.num_simulations = replicates;
    }
    if let Some(threads) = args.threads {
        params.threads = threads;
    }
    params.validate()
}

fn run_with_args_internal(args: &BaseArgs) -> Result<AggregateResult, ModelError> {
    if let Some(level) = &args.log_level {
        let spec: LogSpec = level.parse()?;
        apply_log_spec(&spec);
    }

    let model = build_model(args)?;
    let result = run_replicates(&model)?;

    let output_dir = PathBuf::from(&args.output_dir);
    write_reports(&result, &model.age_bands, &output_dir)?;
    info!(
        "{} replicates of {} agents over {} steps complete",
        result.replicates, model.params.population, model.params.time_steps
    );
    Ok(result)
}
