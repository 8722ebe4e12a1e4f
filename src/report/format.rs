//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the simulation/estimation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::app::pipeline::{CheckOutput, RecoveryReport};
use crate::domain::{CurvePoint, Dataset, ParameterDraw, SimConfig};
use crate::fit::survival_at;

/// Format the header of a posterior-predictive check: policy, sizes and draw accounting.
pub fn format_check_summary(output: &CheckOutput, config: &SimConfig) -> String {
    let summary = &output.summary;
    let policy = config.censoring_policy();
    let mut out = String::new();

    out.push_str("=== survsim - posterior-predictive check ===\n");
    out.push_str(&format!(
        "Policy: {} | subjects/replicate={}\n",
        config.policy.display_name(),
        policy.total_size()
    ));
    out.push_str(&format!(
        "Level: {:.0}% | seed={}\n",
        config.confidence_level * 100.0,
        config.random_seed
    ));
    out.push_str(&format!(
        "Draws: used {}/{} ({:.1}% dropped) | bands={}\n",
        summary.draws_used,
        summary.draws_requested,
        summary.dropped_fraction() * 100.0,
        summary.bands.len()
    ));

    if let Some(curve) = &output.observed_curve {
        let outside = count_outside(output, curve);
        out.push_str(&format!(
            "Observed: {} steps | {outside}/{} bands exclude the observed curve\n",
            curve.len().saturating_sub(1),
            summary.bands.len()
        ));
    }

    if !summary.failures.is_empty() {
        out.push_str("\nDropped draws:\n");
        for f in &summary.failures {
            out.push_str(&format!("- draw {}: {}\n", f.draw_index, f.message));
        }
    }

    out
}

/// Format the band table (first `max_rows` rows, 0 = all).
///
/// With an observed curve the table gains an `observed` column and a `*`
/// marks bins where it falls outside the band.
pub fn format_bands(output: &CheckOutput, max_rows: usize) -> String {
    let bands = &output.summary.bands;
    let observed = output.observed_curve.as_deref();
    let mut out = String::new();

    out.push_str(
        format!(
            "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "time", "mean", "median", "lower", "upper", "observed"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<8} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    let shown = if max_rows == 0 { bands.len() } else { max_rows.min(bands.len()) };
    for b in &bands[..shown] {
        let obs = observed
            .map(|curve| {
                let s = survival_at(curve, b.time_bin as f64);
                let flag = if s < b.lower || s > b.upper { "*" } else { "" };
                format!("{s:>10.4}{flag}")
            })
            .unwrap_or_default();
        out.push_str(
            format!(
                "{:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {obs}",
                b.time_bin, b.mean, b.median, b.lower, b.upper
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if shown < bands.len() {
        out.push_str(&format!("... ({} more)\n", bands.len() - shown));
    }

    out
}

/// Format a recovery experiment.
pub fn format_recovery(report: &RecoveryReport) -> String {
    let mut out = String::new();
    out.push_str("=== survsim - parameter recovery ===\n");
    out.push_str(&format!("Policy: {}\n", report.policy.display_name()));
    out.push_str(&format!(
        "Truth: shape={:.4} location={:.4}\n",
        report.truth.shape, report.truth.location
    ));
    out.push_str(&format!(
        "Replications: {} fitted / {} run\n",
        report.replications_fitted, report.replications
    ));
    out.push_str(&format!(
        "\nCoverage of {:.0}% central intervals:\n",
        report.confidence_level * 100.0
    ));
    out.push_str(&format!("- shape   : {:.3}\n", report.shape_coverage));
    out.push_str(&format!("- location: {:.3}\n", report.location_coverage));
    out.push_str(&format!("- joint   : {:.3}\n", report.joint_coverage));
    out
}

/// Format one simulated dataset and its Kaplan–Meier curve.
pub fn format_dataset(
    data: &Dataset,
    curve: &[CurvePoint],
    truth: &ParameterDraw,
    config: &SimConfig,
) -> String {
    let mut out = String::new();
    out.push_str("=== survsim - simulated dataset ===\n");
    out.push_str(&format!(
        "Policy: {} | shape={:.4} location={:.4} scale={:.4}\n",
        config.policy.display_name(),
        truth.shape,
        truth.location,
        truth.scale()
    ));
    out.push_str(&format!(
        "Subjects: n={} | events={} | censored={}\n",
        data.len(),
        data.n_obs(),
        data.n_cens()
    ));

    out.push_str("\nKaplan-Meier:\n");
    out.push_str(format!("{:>12} {:>10}", "time", "survival").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<10}", "", "").trim_end());
    out.push('\n');
    for p in curve {
        out.push_str(&format!("{:>12.4} {:>10.4}\n", p.time, p.survival));
    }
    out
}

fn count_outside(output: &CheckOutput, curve: &[CurvePoint]) -> usize {
    output
        .summary
        .bands
        .iter()
        .filter(|b| {
            let s = survival_at(curve, b.time_bin as f64);
            s < b.lower || s > b.upper
        })
        .count()
}
