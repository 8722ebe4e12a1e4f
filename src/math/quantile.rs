//! Empirical quantiles and summary statistics.
//!
//! Quantiles use linear interpolation between order statistics
//! (Hyndman & Fan type 7):
//!
//! ```text
//! h = (n - 1) * p
//! q = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])
//! ```
//!
//! Type 7 is monotone in `p`, so for any `p_lo <= 0.5 <= p_hi` the resulting
//! `lower <= median <= upper` holds on the same sample.

/// Sort values ascending using a total order (NaNs sort last).
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Quantile of an ascending-sorted slice. Returns `None` for an empty slice.
///
/// `p` is clamped to `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let p = p.clamp(0.0, 1.0);
    let h = (n as f64 - 1.0) * p;
    let lo = (h.floor() as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median (sorts in place).
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    sort_values(values);
    quantile_sorted(values, 0.5)
}

/// Lower/upper tail probabilities of a central interval with mass `level`.
pub fn central_interval_probs(level: f64) -> (f64, f64) {
    let tail = (1.0 - level) / 2.0;
    (tail, 1.0 - tail)
}

/// Central interval of an unsorted sample (sorts in place).
pub fn central_interval_mut(values: &mut [f64], level: f64) -> Option<(f64, f64)> {
    sort_values(values);
    let (p_lo, p_hi) = central_interval_probs(level);
    Some((quantile_sorted(values, p_lo)?, quantile_sorted(values, p_hi)?))
}
