//! Maximum-likelihood fit of the censored Weibull model.
//!
//! Parameterization matches the simulator: shape `α`, location `μ`, scale
//! `σ = exp(-μ/α)`, so `(t/σ)^α = t^α · e^μ`. The censored log-likelihood is
//!
//! ```text
//! ℓ(α, μ) = d·ln α + (α - 1)·Σ_events ln t + d·μ - e^μ · Σ_all t^α
//! ```
//!
//! For fixed `α` the maximizing location is `μ̂(α) = ln d - ln Σ t^α`, which
//! leaves a one-dimensional profile likelihood in `α`. We maximize it by a
//! parallel grid search over log-spaced shapes and a golden-section
//! refinement inside the bracket around the best grid point.
//!
//! All sums of `t^α` are done in log space (`ln Σ exp(α ln t)`) so long
//! follow-up times cannot overflow for large shapes.

use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::error::SimError;
use crate::fit::shape_grid::log_space;

const GOLDEN_ITERS: usize = 100;

/// Shape search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSearch {
    pub shape_min: f64,
    pub shape_max: f64,
    pub steps: usize,
}

impl Default for ShapeSearch {
    fn default() -> Self {
        Self {
            shape_min: 0.05,
            shape_max: 20.0,
            steps: 80,
        }
    }
}

/// Point estimate with its asymptotic covariance (inverse observed information).
#[derive(Debug, Clone, PartialEq)]
pub struct WeibullFit {
    pub shape: f64,
    pub location: f64,
    pub log_likelihood: f64,
    /// Covariance of `(shape, location)`.
    pub covariance: Matrix2<f64>,
}

impl WeibullFit {
    pub fn mean(&self) -> Vector2<f64> {
        Vector2::new(self.shape, self.location)
    }

    pub fn shape_se(&self) -> f64 {
        self.covariance[(0, 0)].sqrt()
    }

    pub fn location_se(&self) -> f64 {
        self.covariance[(1, 1)].sqrt()
    }
}

/// Sufficient statistics of a dataset for the Weibull likelihood.
#[derive(Debug, Clone)]
struct LikelihoodData {
    n_events: f64,
    sum_log_event_times: f64,
    /// `ln t` for every subject with `t > 0`; zero times contribute nothing to `Σ t^α`.
    log_times: Vec<f64>,
}

impl LikelihoodData {
    fn from_dataset(data: &Dataset) -> Result<Self, SimError> {
        let mut n_events = 0usize;
        let mut sum_log_event_times = 0.0;
        let mut log_times = Vec::with_capacity(data.len());

        for s in data.subjects() {
            let t = s.observed_time;
            if s.is_event() {
                if t <= 0.0 {
                    return Err(SimError::estimation(
                        "Weibull likelihood needs strictly positive event times.",
                    ));
                }
                n_events += 1;
                sum_log_event_times += t.ln();
            }
            if t > 0.0 {
                log_times.push(t.ln());
            }
        }

        if n_events == 0 {
            return Err(SimError::estimation(
                "Cannot fit a Weibull model to a dataset without events.",
            ));
        }

        Ok(Self {
            n_events: n_events as f64,
            sum_log_event_times,
            log_times,
        })
    }

    /// `ln Σ t^α`, computed as a log-sum-exp.
    fn log_sum_pow(&self, shape: f64) -> f64 {
        let max = self
            .log_times
            .iter()
            .map(|&l| shape * l)
            .fold(f64::NEG_INFINITY, f64::max);
        let acc: f64 = self.log_times.iter().map(|&l| (shape * l - max).exp()).sum();
        max + acc.ln()
    }

    fn profile_location(&self, shape: f64) -> f64 {
        self.n_events.ln() - self.log_sum_pow(shape)
    }

    fn log_likelihood(&self, shape: f64, location: f64) -> f64 {
        let d = self.n_events;
        d * shape.ln() + (shape - 1.0) * self.sum_log_event_times + d * location
            - (location + self.log_sum_pow(shape)).exp()
    }

    fn profile_log_likelihood(&self, shape: f64) -> f64 {
        // At μ̂(α) the exposure term equals d.
        let d = self.n_events;
        d * shape.ln() + (shape - 1.0) * self.sum_log_event_times + d * self.profile_location(shape) - d
    }

    /// Observed information at `(shape, μ̂(shape))`.
    ///
    /// With softmax weights `w_i = t_i^α / Σ t^α` and `l_i = ln t_i`:
    ///
    /// ```text
    /// I_αα = d/α² + d·E_w[l²],  I_αμ = d·E_w[l],  I_μμ = d
    /// ```
    fn information_at_profile(&self, shape: f64) -> Matrix2<f64> {
        let d = self.n_events;
        let lse = self.log_sum_pow(shape);
        let mut e_l = 0.0;
        let mut e_l2 = 0.0;
        for &l in &self.log_times {
            let w = (shape * l - lse).exp();
            e_l += w * l;
            e_l2 += w * l * l;
        }
        Matrix2::new(
            d / (shape * shape) + d * e_l2,
            d * e_l,
            d * e_l,
            d,
        )
    }
}

/// Evaluate the censored Weibull log-likelihood of `data` at `(shape, location)`.
pub fn weibull_log_likelihood(data: &Dataset, shape: f64, location: f64) -> Result<f64, SimError> {
    if !(shape.is_finite() && shape > 0.0) {
        return Err(SimError::configuration(format!("shape must be > 0, got {shape}")));
    }
    Ok(LikelihoodData::from_dataset(data)?.log_likelihood(shape, location))
}

/// Maximum-likelihood fit with the default shape search.
pub fn fit_weibull(data: &Dataset) -> Result<WeibullFit, SimError> {
    fit_weibull_with(data, &ShapeSearch::default())
}

/// Maximum-likelihood fit over a configurable shape search range.
pub fn fit_weibull_with(data: &Dataset, search: &ShapeSearch) -> Result<WeibullFit, SimError> {
    let lik = LikelihoodData::from_dataset(data)?;
    let grid = log_space(search.shape_min, search.shape_max, search.steps)?;

    // Evaluate each grid shape independently (parallel).
    let scores: Vec<f64> = grid
        .par_iter()
        .map(|&shape| lik.profile_log_likelihood(shape))
        .collect();

    // Deterministic selection: highest profile likelihood, ties by grid index.
    let mut best_idx: Option<usize> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best_idx {
            Some(b) if scores[b] >= score => {}
            _ => best_idx = Some(idx),
        }
    }
    let Some(best_idx) = best_idx else {
        return Err(SimError::estimation("Profile likelihood is non-finite on the whole shape grid."));
    };

    let lo = grid[best_idx.saturating_sub(1)];
    let hi = grid[(best_idx + 1).min(grid.len() - 1)];
    let shape = golden_section_max(|a| lik.profile_log_likelihood(a), lo, hi, GOLDEN_ITERS);
    let location = lik.profile_location(shape);

    let information = lik.information_at_profile(shape);
    let covariance = information.try_inverse().ok_or_else(|| {
        SimError::estimation("Observed information matrix is singular at the Weibull mode.")
    })?;

    if !(shape.is_finite() && location.is_finite() && covariance.iter().all(|v| v.is_finite())) {
        return Err(SimError::estimation("Non-finite Weibull fit."));
    }

    Ok(WeibullFit {
        shape,
        location,
        log_likelihood: lik.log_likelihood(shape, location),
        covariance,
    })
}

fn golden_section_max<F>(f: F, mut a: f64, mut b: f64, iters: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    for _ in 0..iters {
        if (b - a).abs() < 1e-12 {
            break;
        }
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CensoringPolicy, ParameterDraw, Subject};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn recovers_parameters_from_large_uncensored_sample() {
        let truth = ParameterDraw::new(1.5, -2.0);
        let policy = CensoringPolicy::DependentFraction {
            n_obs: 20_000,
            n_cens: 0,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let data = policy.simulate(&truth, 0, &mut rng).unwrap();
        let fit = fit_weibull(&data).unwrap();

        assert!((fit.shape - 1.5).abs() < 0.05, "shape {}", fit.shape);
        assert!((fit.location + 2.0).abs() < 0.1, "location {}", fit.location);
        assert!(fit.shape_se() > 0.0 && fit.location_se() > 0.0);
    }

    #[test]
    fn recovers_parameters_under_independent_censoring() {
        let truth = ParameterDraw::new(0.8, -3.0);
        let policy = CensoringPolicy::IndependentExponential {
            n_total: 20_000,
            rate: 0.01,
        };
        let mut rng = StdRng::seed_from_u64(8);
        let data = policy.simulate(&truth, 0, &mut rng).unwrap();
        let fit = fit_weibull(&data).unwrap();

        assert!((fit.shape - 0.8).abs() < 4.0 * fit.shape_se() + 0.01, "shape {}", fit.shape);
        assert!(
            (fit.location + 3.0).abs() < 4.0 * fit.location_se() + 0.01,
            "location {}",
            fit.location
        );
    }

    #[test]
    fn mode_beats_nearby_points() {
        let data = Dataset::new(vec![
            Subject::event(0.5),
            Subject::event(1.2),
            Subject::censored(2.0),
            Subject::event(2.4),
            Subject::event(3.1),
            Subject::censored(4.0),
            Subject::event(5.5),
        ])
        .unwrap();
        let fit = fit_weibull(&data).unwrap();
        let ll = fit.log_likelihood;
        for (da, dm) in [(0.05, 0.0), (-0.05, 0.0), (0.0, 0.05), (0.0, -0.05)] {
            let other = weibull_log_likelihood(&data, fit.shape + da, fit.location + dm).unwrap();
            assert!(ll >= other, "ll {ll} < {other} at offset ({da}, {dm})");
        }
    }

    #[test]
    fn exponential_data_has_closed_form_location_at_unit_shape() {
        // For α = 1 the location MLE is ln(d / Σ t).
        let data = Dataset::new(vec![
            Subject::event(1.0),
            Subject::event(2.0),
            Subject::censored(3.0),
        ])
        .unwrap();
        let lik = LikelihoodData::from_dataset(&data).unwrap();
        let mu = lik.profile_location(1.0);
        assert!((mu - (2.0_f64 / 6.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn rejects_datasets_without_events() {
        let data = Dataset::new(vec![Subject::censored(1.0)]).unwrap();
        let err = fit_weibull(&data).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn golden_section_finds_parabola_peak() {
        let x = golden_section_max(|x| -(x - 1.3) * (x - 1.3), 0.0, 3.0, 200);
        assert!((x - 1.3).abs() < 1e-6);
    }
}
