//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initializes logging
//! - simulates (or loads) the inputs for a run
//! - runs the pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, Command, RecoveryArgs, SimArgs, SimulateArgs, TruthArgs};
use crate::data::replicate_rng;
use crate::domain::{ParameterDraw, SimConfig};
use crate::error::SimError;
use crate::fit::{LaplaceSampler, PosteriorSampler, kaplan_meier};

pub mod pipeline;

/// Substream index reserved for the synthetic "observed" dataset, so it never
/// coincides with a replicate stream.
const OBSERVED_STREAM: usize = usize::MAX;

/// Entry point for the `survsim` binary.
pub fn run() -> Result<(), SimError> {
    init_logging();

    // `survsim` and `survsim --policy ...` behave like `survsim check ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Check(args) => handle_check(args),
        Command::Recovery(args) => handle_recovery(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_check(args: CheckArgs) -> Result<(), SimError> {
    let config = sim_config_from_args(&args.sim);
    config.validate()?;

    let truth = truth_from_args(&args.truth);
    let mut rng = replicate_rng(config.random_seed, OBSERVED_STREAM);
    let observed = config.censoring_policy().simulate(&truth, 0, &mut rng)?;
    info!(
        n_obs = observed.n_obs(),
        n_cens = observed.n_cens(),
        "simulated observed dataset"
    );

    let draws = match &args.draws_file {
        Some(path) => crate::io::read_draws_json(path)?,
        None => LaplaceSampler::default().sample(&observed, args.draws, &mut rng)?,
    };

    let output = pipeline::run_check(&draws, &config, Some(&observed))?;

    println!("{}", crate::report::format_check_summary(&output, &config));
    println!("{}", crate::report::format_bands(&output, args.max_rows));

    if let Some(path) = &args.export_csv {
        crate::io::write_bands_csv(path, &output.summary.bands)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_check_json(path, &output, &config)?;
    }

    Ok(())
}

fn handle_recovery(args: RecoveryArgs) -> Result<(), SimError> {
    let config = sim_config_from_args(&args.sim);
    let truth = truth_from_args(&args.truth);
    let report = pipeline::run_recovery(
        truth,
        &config,
        args.replications,
        args.draws,
        &LaplaceSampler::default(),
    )?;
    println!("{}", crate::report::format_recovery(&report));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), SimError> {
    let config = sim_config_from_args(&args.sim);
    config.validate()?;

    let truth = truth_from_args(&args.truth);
    let mut rng = replicate_rng(config.random_seed, 0);
    let data = config.censoring_policy().simulate(&truth, 0, &mut rng)?;
    let curve = kaplan_meier(&data);

    println!("{}", crate::report::format_dataset(&data, &curve, &truth, &config));
    Ok(())
}

pub fn sim_config_from_args(args: &SimArgs) -> SimConfig {
    SimConfig {
        policy: args.policy,
        n_obs: args.n_obs,
        n_cens: args.n_cens,
        n_total: args.n_total,
        censor_rate: args.censor_rate,
        confidence_level: args.confidence_level,
        random_seed: args.seed,
    }
}

fn truth_from_args(args: &TruthArgs) -> ParameterDraw {
    ParameterDraw::new(args.shape, args.location)
}

/// Rewrite argv so `survsim` defaults to `survsim check`.
///
/// Rules:
/// - `survsim`                       -> `survsim check`
/// - `survsim --policy X ...`        -> `survsim check --policy X ...`
/// - `survsim --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("check".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "check" | "recovery" | "simulate");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "check".to_string());
        return argv;
    }

    argv
}
