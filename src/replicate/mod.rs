//! Posterior-predictive replicate aggregation.
//!
//! One simulated dataset per posterior draw, one Kaplan–Meier curve per
//! dataset, then a per-integer-time reduction across all curves.

pub mod aggregator;

pub use aggregator::*;
