//! Command-line parsing for the survival replicate simulator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the simulation/estimation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_CENSOR_RATE, DEFAULT_CONFIDENCE_LEVEL, PolicyKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "survsim",
    version,
    about = "Weibull survival replicate simulator for posterior-predictive checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate replicate curves for posterior draws and print per-time bands.
    Check(CheckArgs),
    /// Measure how often posterior intervals cover the generating parameters.
    Recovery(RecoveryArgs),
    /// Simulate a single dataset and print its Kaplan–Meier curve.
    Simulate(SimulateArgs),
}

/// Simulation options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct SimArgs {
    /// Censoring mechanism used for simulated datasets.
    #[arg(long, value_enum, default_value_t = PolicyKind::DependentFraction)]
    pub policy: PolicyKind,

    /// Number of EVENT subjects (dependent-fraction policy).
    #[arg(long, default_value_t = 179)]
    pub n_obs: usize,

    /// Number of CENSORED subjects (dependent-fraction policy).
    #[arg(long, default_value_t = 230)]
    pub n_cens: usize,

    /// Subjects per dataset for the independent policy (default: n-obs + n-cens).
    #[arg(long)]
    pub n_total: Option<usize>,

    /// Rate of the exponential censoring clock (independent policy).
    #[arg(long, default_value_t = DEFAULT_CENSOR_RATE)]
    pub censor_rate: f64,

    /// Central interval mass of the bands, in (0, 1).
    #[arg(short = 'l', long, default_value_t = DEFAULT_CONFIDENCE_LEVEL)]
    pub confidence_level: f64,

    /// Base random seed; replicate i uses seed XOR i.
    #[arg(long, default_value_t = 1328025050)]
    pub seed: u64,
}

/// Generating parameters for a synthetic observed dataset.
#[derive(Debug, Args, Clone)]
pub struct TruthArgs {
    /// Weibull shape used to generate the observed dataset.
    #[arg(long, default_value_t = 0.8)]
    pub shape: f64,

    /// Weibull location (mu) used to generate the observed dataset.
    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    pub location: f64,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    #[command(flatten)]
    pub truth: TruthArgs,

    /// Number of posterior draws from the built-in Laplace sampler.
    #[arg(short = 'd', long, default_value_t = 1000)]
    pub draws: usize,

    /// JSON array of `{"shape": .., "location": ..}` draws from an external engine.
    ///
    /// When given, the built-in sampler is skipped.
    #[arg(long, value_name = "JSON")]
    pub draws_file: Option<PathBuf>,

    /// Only print the first N bands (0 = all).
    #[arg(long, default_value_t = 0)]
    pub max_rows: usize,

    /// Export bands to CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Export bands, observed curve and draw accounting to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RecoveryArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    #[command(flatten)]
    pub truth: TruthArgs,

    /// Number of simulate -> fit repetitions.
    #[arg(short = 'r', long, default_value_t = 200)]
    pub replications: usize,

    /// Posterior draws per repetition.
    #[arg(short = 'd', long, default_value_t = 400)]
    pub draws: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    #[command(flatten)]
    pub truth: TruthArgs,
}
