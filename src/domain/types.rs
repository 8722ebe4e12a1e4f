//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between worker threads during replicate simulation
//! - exported to JSON/CSV
//! - reloaded later (e.g. draws produced by an external inference engine)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Default central interval mass for aggregated bands.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.9;

/// Default rate of the exponential censoring clock (mean censoring time 100).
pub const DEFAULT_CENSOR_RATE: f64 = 0.01;

/// One posterior draw of the Weibull model parameters.
///
/// `shape` is the Weibull shape `α`; `location` is the linear-predictor
/// location `μ`. The scale used for sampling is derived, see [`ParameterDraw::scale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDraw {
    pub shape: f64,
    pub location: f64,
}

impl ParameterDraw {
    pub fn new(shape: f64, location: f64) -> Self {
        Self { shape, location }
    }

    /// Weibull scale `σ = exp(-μ/α)`.
    pub fn scale(&self) -> f64 {
        (-self.location / self.shape).exp()
    }

    /// Scale, or a `NumericRange` error if it over/underflows.
    pub fn checked_scale(&self, draw_index: usize) -> Result<f64, SimError> {
        if !(self.shape.is_finite() && self.shape > 0.0) {
            return Err(SimError::numeric_range(
                draw_index,
                format!("shape must be finite and > 0, got {}", self.shape),
            ));
        }
        let scale = self.scale();
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SimError::numeric_range(
                draw_index,
                format!(
                    "scale exp(-{}/{}) is not representable ({scale})",
                    self.location, self.shape
                ),
            ));
        }
        Ok(scale)
    }
}

/// Observation status of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Event,
    Censored,
}

/// One simulated or real individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub observed_time: f64,
    pub status: Status,
}

impl Subject {
    pub fn event(observed_time: f64) -> Self {
        Self {
            observed_time,
            status: Status::Event,
        }
    }

    pub fn censored(observed_time: f64) -> Self {
        Self {
            observed_time,
            status: Status::Censored,
        }
    }

    pub fn is_event(&self) -> bool {
        self.status == Status::Event
    }
}

/// An ordered collection of subjects.
///
/// Serialized as a plain array of subjects; deserialization goes through
/// [`Dataset::new`], so invalid times are rejected there too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Subject>", into = "Vec<Subject>")]
pub struct Dataset {
    subjects: Vec<Subject>,
}

impl TryFrom<Vec<Subject>> for Dataset {
    type Error = SimError;

    fn try_from(subjects: Vec<Subject>) -> Result<Self, Self::Error> {
        Dataset::new(subjects)
    }
}

impl From<Dataset> for Vec<Subject> {
    fn from(data: Dataset) -> Self {
        data.subjects
    }
}

impl Dataset {
    /// Build a dataset from externally supplied records.
    ///
    /// Rejects negative or non-finite observed times.
    pub fn new(subjects: Vec<Subject>) -> Result<Self, SimError> {
        if let Some((idx, s)) = subjects
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.observed_time.is_finite() && s.observed_time >= 0.0))
        {
            return Err(SimError::configuration(format!(
                "subject {idx}: observed_time must be finite and >= 0, got {}",
                s.observed_time
            )));
        }
        Ok(Self { subjects })
    }

    /// Wrap subjects produced by the simulator (times are nonnegative by construction).
    pub(crate) fn from_simulated(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Number of EVENT subjects.
    pub fn n_obs(&self) -> usize {
        self.subjects.iter().filter(|s| s.is_event()).count()
    }

    /// Number of CENSORED subjects.
    pub fn n_cens(&self) -> usize {
        self.len() - self.n_obs()
    }
}

/// One step of a Kaplan–Meier survival curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time: f64,
    pub survival: f64,
}

/// Integer time unit a curve point is discretized into (`floor(time)`).
pub type TimeBin = u64;

/// Per-bin summary of survival values across replicate curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBand {
    pub time_bin: TimeBin,
    pub mean: f64,
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Which censoring mechanism to simulate under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Fixed event/censored counts; censored times are `u·w` with `w` drawn
    /// from the event-time law (informative censoring).
    DependentFraction,
    /// Latent race between a Weibull event clock and an exponential censoring clock.
    IndependentExponential,
}

impl PolicyKind {
    pub fn display_name(self) -> &'static str {
        match self {
            PolicyKind::DependentFraction => "dependent-fraction",
            PolicyKind::IndependentExponential => "independent-exponential",
        }
    }
}

/// A censoring mechanism together with its sample sizes.
///
/// Simulation lives in `crate::data::censoring`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CensoringPolicy {
    DependentFraction { n_obs: usize, n_cens: usize },
    IndependentExponential { n_total: usize, rate: f64 },
}

impl CensoringPolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            CensoringPolicy::DependentFraction { .. } => PolicyKind::DependentFraction,
            CensoringPolicy::IndependentExponential { .. } => PolicyKind::IndependentExponential,
        }
    }

    /// Number of subjects one simulated dataset will contain.
    pub fn total_size(&self) -> usize {
        match *self {
            CensoringPolicy::DependentFraction { n_obs, n_cens } => n_obs + n_cens,
            CensoringPolicy::IndependentExponential { n_total, .. } => n_total,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub policy: PolicyKind,
    /// EVENT count for the dependent-fraction policy.
    pub n_obs: usize,
    /// CENSORED count for the dependent-fraction policy.
    pub n_cens: usize,
    /// Subject count for the independent policy; `None` means `n_obs + n_cens`.
    pub n_total: Option<usize>,
    /// Rate of the exponential censoring clock (independent policy only).
    pub censor_rate: f64,
    /// Central interval mass for bands, in `(0, 1)`.
    pub confidence_level: f64,
    pub random_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::DependentFraction,
            n_obs: 179,
            n_cens: 230,
            n_total: None,
            censor_rate: DEFAULT_CENSOR_RATE,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            random_seed: 1328025050,
        }
    }
}

impl SimConfig {
    /// Check the configuration-level invariants. Fails fast; no partial results.
    pub fn validate(&self) -> Result<(), SimError> {
        let level = self.confidence_level;
        if !(level.is_finite() && level > 0.0 && level < 1.0) {
            return Err(SimError::configuration(format!(
                "confidence_level must lie in (0, 1), got {level}"
            )));
        }
        if self.policy == PolicyKind::IndependentExponential
            && !(self.censor_rate.is_finite() && self.censor_rate > 0.0)
        {
            return Err(SimError::configuration(format!(
                "censor_rate must be finite and > 0, got {}",
                self.censor_rate
            )));
        }
        Ok(())
    }

    /// Resolve the policy variant with its sample sizes.
    pub fn censoring_policy(&self) -> CensoringPolicy {
        match self.policy {
            PolicyKind::DependentFraction => CensoringPolicy::DependentFraction {
                n_obs: self.n_obs,
                n_cens: self.n_cens,
            },
            PolicyKind::IndependentExponential => CensoringPolicy::IndependentExponential {
                n_total: self.n_total.unwrap_or(self.n_obs + self.n_cens),
                rate: self.censor_rate,
            },
        }
    }
}

/// Reject an empty draw sequence or any draw with a non-positive shape.
pub fn validate_draws(draws: &[ParameterDraw]) -> Result<(), SimError> {
    if draws.is_empty() {
        return Err(SimError::configuration("draw sequence is empty"));
    }
    if let Some((idx, d)) = draws
        .iter()
        .enumerate()
        .find(|(_, d)| !(d.shape.is_finite() && d.shape > 0.0))
    {
        return Err(SimError::configuration(format!(
            "draw {idx}: shape must be finite and > 0, got {}",
            d.shape
        )));
    }
    Ok(())
}
