//! Replicate simulation and per-bin reduction.
//!
//! Pipeline per draw `d` (parallel, one RNG substream per draw):
//!
//! ```text
//! simulate(policy, draw_d, rng_d) -> kaplan_meier -> [(floor(time), survival)]
//! ```
//!
//! Per-worker partial maps `bin -> [survival]` are merged by concatenation,
//! which is associative and commutative, so any merge order gives the same
//! multiset per bin. Values are sorted before reduction, which also fixes the
//! floating-point summation order of the mean.
//!
//! Every curve point contributes one value to its bin. A draw whose curve has
//! several steps inside one integer unit contributes several values to that
//! bin; no per-draw weighting is applied.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::replicate_rng;
use crate::domain::{
    AggregatedBand, CensoringPolicy, CurvePoint, ParameterDraw, SimConfig, TimeBin,
};
use crate::error::SimError;
use crate::fit::kaplan_meier;
use crate::math::{central_interval_probs, mean, quantile_sorted, sort_values};

/// A draw that was dropped from aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawFailure {
    pub draw_index: usize,
    pub message: String,
}

/// Aggregated bands plus draw accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateSummary {
    pub bands: Vec<AggregatedBand>,
    pub draws_requested: usize,
    pub draws_used: usize,
    /// Sorted by `draw_index`.
    pub failures: Vec<DrawFailure>,
}

impl ReplicateSummary {
    pub fn dropped_fraction(&self) -> f64 {
        if self.draws_requested == 0 {
            return 0.0;
        }
        (self.draws_requested - self.draws_used) as f64 / self.draws_requested as f64
    }
}

/// Drives one simulate+estimate step per draw and reduces the curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicateAggregator {
    pub policy: CensoringPolicy,
    pub confidence_level: f64,
    pub base_seed: u64,
}

impl ReplicateAggregator {
    pub fn new(policy: CensoringPolicy, confidence_level: f64, base_seed: u64) -> Result<Self, SimError> {
        if !(confidence_level.is_finite() && confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(SimError::configuration(format!(
                "confidence_level must lie in (0, 1), got {confidence_level}"
            )));
        }
        Ok(Self {
            policy,
            confidence_level,
            base_seed,
        })
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Self::new(config.censoring_policy(), config.confidence_level, config.random_seed)
    }

    /// Simulate and estimate the curve for draw `index`.
    pub fn replicate_curve(&self, index: usize, draw: &ParameterDraw) -> Result<Vec<CurvePoint>, SimError> {
        let mut rng = replicate_rng(self.base_seed, index);
        let data = self.policy.simulate(draw, index, &mut rng)?;
        Ok(kaplan_meier(&data))
    }

    /// Run every draw and reduce to per-bin bands.
    ///
    /// Fails only on an empty draw sequence; per-draw failures are dropped
    /// and reported in the summary.
    pub fn run(&self, draws: &[ParameterDraw]) -> Result<ReplicateSummary, SimError> {
        if draws.is_empty() {
            return Err(SimError::configuration("draw sequence is empty"));
        }

        let merged = draws
            .par_iter()
            .enumerate()
            .fold(BinMap::default, |mut acc, (index, draw)| {
                match self.replicate_curve(index, draw) {
                    Ok(curve) => acc.absorb_curve(&curve),
                    Err(err) => acc.record_failure(index, err),
                }
                acc
            })
            .reduce(BinMap::default, BinMap::merge);

        let BinMap {
            bins,
            mut failures,
            used,
        } = merged;
        failures.sort_by_key(|f| f.draw_index);

        for f in &failures {
            warn!(draw_index = f.draw_index, error = %f.message, "dropping draw from aggregation");
        }
        debug!(bins = bins.len(), draws_used = used, "replicate curves binned");

        Ok(ReplicateSummary {
            bands: summarize_bins(bins, self.confidence_level),
            draws_requested: draws.len(),
            draws_used: used,
            failures,
        })
    }
}

/// Per-worker partial result.
#[derive(Debug, Default)]
struct BinMap {
    bins: BTreeMap<TimeBin, Vec<f64>>,
    failures: Vec<DrawFailure>,
    used: usize,
}

impl BinMap {
    fn absorb_curve(&mut self, curve: &[CurvePoint]) {
        for (bin, survival) in bin_curve(curve) {
            self.bins.entry(bin).or_default().push(survival);
        }
        self.used += 1;
    }

    fn record_failure(&mut self, draw_index: usize, err: SimError) {
        self.failures.push(DrawFailure {
            draw_index,
            message: err.to_string(),
        });
    }

    fn merge(mut self, other: BinMap) -> BinMap {
        for (bin, mut values) in other.bins {
            self.bins.entry(bin).or_default().append(&mut values);
        }
        self.failures.extend(other.failures);
        self.used += other.used;
        self
    }
}

/// Integer time unit of a (nonnegative) time.
pub fn time_bin(time: f64) -> TimeBin {
    time.max(0.0).floor() as TimeBin
}

/// Flatten a curve into `(bin, survival)` pairs, one per curve point.
pub fn bin_curve(curve: &[CurvePoint]) -> impl Iterator<Item = (TimeBin, f64)> + '_ {
    curve.iter().map(|p| (time_bin(p.time), p.survival))
}

/// Reduce a bin multimap to bands, ascending by bin.
///
/// Empty value lists are skipped.
pub fn summarize_bins(bins: BTreeMap<TimeBin, Vec<f64>>, confidence_level: f64) -> Vec<AggregatedBand> {
    let (p_lo, p_hi) = central_interval_probs(confidence_level);

    bins.into_iter()
        .filter_map(|(time_bin, mut values)| {
            sort_values(&mut values);
            Some(AggregatedBand {
                time_bin,
                mean: mean(&values)?,
                median: quantile_sorted(&values, 0.5)?,
                lower: quantile_sorted(&values, p_lo)?,
                upper: quantile_sorted(&values, p_hi)?,
            })
        })
        .collect()
}
