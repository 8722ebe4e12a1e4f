//! Composite Simpson integration on a finite interval.

use crate::error::SimError;

/// Integrate `f` over `[a, b]` with `intervals` Simpson panels.
///
/// `intervals` is rounded up to the next even number.
pub fn simpson<F>(f: F, a: f64, b: f64, intervals: usize) -> Result<f64, SimError>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite() && b > a) {
        return Err(SimError::configuration(format!(
            "Invalid integration range: [{a}, {b}]"
        )));
    }
    if intervals < 2 {
        return Err(SimError::configuration("Simpson integration needs >= 2 intervals."));
    }
    let n = intervals + intervals % 2;
    let h = (b - a) / n as f64;

    let mut acc = f(a) + f(b);
    for i in 1..n {
        let x = a + h * i as f64;
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        acc += weight * f(x);
    }
    let value = acc * h / 3.0;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::estimation("Non-finite integral."))
    }
}
