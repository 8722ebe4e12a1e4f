//! Shape grid generation.
//!
//! The Weibull profile likelihood is maximized by a deterministic grid search
//! over `α` followed by a bracketed refinement around the best grid point.

use crate::error::SimError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, SimError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(SimError::configuration(format!(
            "Invalid shape range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 3 {
        return Err(SimError::configuration("Shape grid steps must be >= 3."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    Ok((0..steps).map(|i| (ln_min + step * i as f64).exp()).collect())
}
