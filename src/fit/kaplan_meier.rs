//! Kaplan–Meier (product-limit) survival curve estimation.
//!
//! For distinct event times `t₁ < … < t_k`:
//!
//! ```text
//! S(t_i) = S(t_{i-1}) · (1 - d_i / n_i)
//! ```
//!
//! where `d_i` counts events at `t_i` and `n_i` counts every subject with
//! `observed_time >= t_i`. A subject censored at `c` is still at risk at `c`
//! and leaves the risk set afterwards. Censoring never drops the curve.
//!
//! The returned step function starts with the origin `(0, 1)` followed by one
//! point per distinct event time. If the earliest event is at exactly `0`, the
//! origin is omitted so the curve stays right-continuous at `0`.
//! A dataset without events yields the constant curve `[(0, 1)]`.

use crate::domain::{CurvePoint, Dataset};

/// Estimate the survival curve of a dataset.
pub fn kaplan_meier(data: &Dataset) -> Vec<CurvePoint> {
    let mut obs: Vec<(f64, bool)> = data
        .subjects()
        .iter()
        .map(|s| (s.observed_time, s.is_event()))
        .collect();
    obs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = obs.len();
    let mut steps = Vec::new();
    let mut survival = 1.0_f64;
    let mut i = 0;

    while i < n {
        let t = obs[i].0;
        // Sorted ascending, so everyone from `i` on has observed_time >= t.
        let at_risk = n - i;
        let mut deaths = 0usize;
        let mut j = i;
        while j < n && obs[j].0 == t {
            if obs[j].1 {
                deaths += 1;
            }
            j += 1;
        }

        if deaths > 0 {
            survival *= 1.0 - deaths as f64 / at_risk as f64;
            steps.push(CurvePoint { time: t, survival });
        }
        i = j;
    }

    let starts_at_zero = steps.first().is_some_and(|p| p.time <= 0.0);
    let mut curve = Vec::with_capacity(steps.len() + 1);
    if !starts_at_zero {
        curve.push(CurvePoint {
            time: 0.0,
            survival: 1.0,
        });
    }
    curve.extend(steps);
    curve
}

/// Evaluate a step curve at `t` (right-continuous; `1` before the first step).
pub fn survival_at(curve: &[CurvePoint], t: f64) -> f64 {
    let idx = curve.partition_point(|p| p.time <= t);
    if idx == 0 {
        1.0
    } else {
        curve[idx - 1].survival
    }
}
