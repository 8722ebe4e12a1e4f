//! Synthetic dataset generation under the two censoring mechanisms.
//!
//! Both variants draw event times from `Weibull(shape = α, scale = σ)` with
//! `σ = exp(-μ/α)`. They differ in where censored observations come from:
//!
//! - `DependentFraction`: the caller fixes how many subjects are events and how
//!   many are censored. Censored times are `u·w` with `u ~ U(0,1)` and `w` a
//!   fresh draw from the *event-time* law, so censoring is informative and
//!   stochastically earlier than events. There is no latent race.
//! - `IndependentExponential`: every subject races a Weibull event clock
//!   against an independent `Exp(rate)` censoring clock.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp, Weibull};

use crate::domain::{CensoringPolicy, Dataset, ParameterDraw, Subject};
use crate::error::SimError;
use crate::math::simpson;

/// Seed of the random substream for replicate `index`.
///
/// Each replicate gets its own stream so results do not depend on the order
/// (or thread) in which replicates run.
pub fn replicate_seed(base_seed: u64, index: usize) -> u64 {
    base_seed ^ index as u64
}

/// Deterministic RNG for replicate `index`.
pub fn replicate_rng(base_seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(replicate_seed(base_seed, index))
}

impl CensoringPolicy {
    /// Simulate one dataset for a single parameter draw.
    ///
    /// `draw_index` is only used to label errors.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        draw: &ParameterDraw,
        draw_index: usize,
        rng: &mut R,
    ) -> Result<Dataset, SimError> {
        let scale = draw.checked_scale(draw_index)?;
        let weibull = Weibull::new(scale, draw.shape).map_err(|e| {
            SimError::numeric_range(draw_index, format!("Weibull distribution error: {e}"))
        })?;

        let subjects = match *self {
            CensoringPolicy::DependentFraction { n_obs, n_cens } => {
                let mut subjects = Vec::with_capacity(n_obs + n_cens);
                for _ in 0..n_obs {
                    let t = finite_time(weibull.sample(rng), draw_index)?;
                    subjects.push(Subject::event(t));
                }
                for _ in 0..n_cens {
                    let u: f64 = rng.r#gen();
                    let w = finite_time(weibull.sample(rng), draw_index)?;
                    subjects.push(Subject::censored(u * w));
                }
                subjects
            }
            CensoringPolicy::IndependentExponential { n_total, rate } => {
                let censor = Exp::new(rate).map_err(|e| {
                    SimError::configuration(format!("Censoring distribution error: {e}"))
                })?;
                let mut subjects = Vec::with_capacity(n_total);
                for _ in 0..n_total {
                    let event_time = weibull.sample(rng);
                    let censor_time = censor.sample(rng);
                    // An overflowed event clock still loses the race to a finite censoring clock.
                    if event_time < censor_time {
                        subjects.push(Subject::event(finite_time(event_time, draw_index)?));
                    } else {
                        subjects.push(Subject::censored(finite_time(censor_time, draw_index)?));
                    }
                }
                subjects
            }
        };

        Ok(Dataset::from_simulated(subjects))
    }
}

/// Reject a sampled time that overflowed; a finite scale does not bound the sample.
fn finite_time(t: f64, draw_index: usize) -> Result<f64, SimError> {
    if t.is_finite() {
        Ok(t)
    } else {
        Err(SimError::numeric_range(
            draw_index,
            format!("sampled time is not representable ({t})"),
        ))
    }
}

/// Closed-form-by-quadrature `P(event_time < censor_time)` for the
/// independent-exponential policy:
///
/// ```text
/// P(T < C) = 1 - ∫₀^∞ S_T(c) · rate · exp(-rate·c) dc,   S_T(c) = exp(-(c/σ)^α)
/// ```
///
/// The integral is truncated where the censoring density falls below `e^-50`.
pub fn expected_event_fraction(draw: &ParameterDraw, rate: f64) -> Result<f64, SimError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(SimError::configuration(format!(
            "censor rate must be finite and > 0, got {rate}"
        )));
    }
    let scale = draw.checked_scale(0)?;
    let shape = draw.shape;
    let upper = 50.0 / rate;

    let censored_fraction = simpson(
        |c| (-(c / scale).powf(shape)).exp() * rate * (-rate * c).exp(),
        0.0,
        upper,
        200_000,
    )?;
    Ok((1.0 - censored_fraction).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;

    fn truth() -> ParameterDraw {
        ParameterDraw::new(0.8, -3.0)
    }

    #[test]
    fn dependent_fraction_uses_requested_counts() {
        let policy = CensoringPolicy::DependentFraction {
            n_obs: 179,
            n_cens: 230,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let data = policy.simulate(&truth(), 0, &mut rng).unwrap();
        assert_eq!(data.len(), 409);
        assert_eq!(data.n_obs(), 179);
        assert_eq!(data.n_cens(), 230);
        assert!(data.subjects().iter().all(|s| s.observed_time >= 0.0));
    }

    #[test]
    fn dependent_fraction_censors_earlier_than_events() {
        // E[u·w] = E[w]/2, so censored times are stochastically smaller.
        let policy = CensoringPolicy::DependentFraction {
            n_obs: 20_000,
            n_cens: 20_000,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let data = policy.simulate(&truth(), 0, &mut rng).unwrap();

        let (mut ev, mut ce) = (Vec::new(), Vec::new());
        for s in data.subjects() {
            match s.status {
                Status::Event => ev.push(s.observed_time),
                Status::Censored => ce.push(s.observed_time),
            }
        }
        let med_ev = crate::math::median_mut(&mut ev).unwrap();
        let med_ce = crate::math::median_mut(&mut ce).unwrap();
        assert!(
            med_ce < 0.8 * med_ev,
            "censored median {med_ce:.2} should be well below event median {med_ev:.2}"
        );
    }

    #[test]
    fn independent_event_fraction_matches_quadrature() {
        let rate = 0.01;
        let policy = CensoringPolicy::IndependentExponential {
            n_total: 100_000,
            rate,
        };
        let mut rng = StdRng::seed_from_u64(1328025050);
        let data = policy.simulate(&truth(), 0, &mut rng).unwrap();

        let observed = data.n_obs() as f64 / data.len() as f64;
        let expected = expected_event_fraction(&truth(), rate).unwrap();
        assert!(
            (observed - expected).abs() < 0.02,
            "event fraction {observed:.4} vs expected {expected:.4}"
        );
    }

    #[test]
    fn independent_observed_time_is_min_of_clocks() {
        // With a censoring clock far beyond any plausible event time, almost
        // every subject is an event.
        let policy = CensoringPolicy::IndependentExponential {
            n_total: 2_000,
            rate: 1e-9,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let data = policy.simulate(&ParameterDraw::new(2.0, 0.0), 0, &mut rng).unwrap();
        assert!(data.n_obs() >= 1_990, "n_obs={}", data.n_obs());
    }

    #[test]
    fn same_seed_reproduces_dataset() {
        let policy = CensoringPolicy::IndependentExponential {
            n_total: 50,
            rate: 0.01,
        };
        let a = policy.simulate(&truth(), 0, &mut replicate_rng(99, 4)).unwrap();
        let b = policy.simulate(&truth(), 0, &mut replicate_rng(99, 4)).unwrap();
        let c = policy.simulate(&truth(), 0, &mut replicate_rng(99, 5)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn overflowing_scale_is_a_numeric_range_error() {
        let policy = CensoringPolicy::DependentFraction { n_obs: 5, n_cens: 5 };
        let mut rng = StdRng::seed_from_u64(0);
        let err = policy
            .simulate(&ParameterDraw::new(0.01, -50.0), 17, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::NumericRange { draw_index: 17, .. }));
    }

    #[test]
    fn overflowing_sample_with_finite_scale_is_a_numeric_range_error() {
        // scale = exp(650) is finite, but (-ln u)^50 pushes most samples past f64::MAX.
        let draw = ParameterDraw::new(0.02, -13.0);
        assert!(draw.checked_scale(0).is_ok());

        let policy = CensoringPolicy::DependentFraction {
            n_obs: 179,
            n_cens: 230,
        };
        let err = policy
            .simulate(&draw, 9, &mut replicate_rng(1328025050, 9))
            .unwrap_err();
        assert!(matches!(err, SimError::NumericRange { draw_index: 9, .. }));
    }

    #[test]
    fn zero_sizes_give_empty_dataset() {
        let policy = CensoringPolicy::DependentFraction { n_obs: 0, n_cens: 0 };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(policy.simulate(&truth(), 0, &mut rng).unwrap().is_empty());
    }
}
