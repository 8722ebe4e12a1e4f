//! Estimation.
//!
//! Responsibilities:
//!
//! - Kaplan–Meier curves for simulated and observed datasets
//! - censored Weibull likelihood and its maximum (grid search + refinement)
//! - a reference posterior sampler standing in for the external inference engine

pub mod kaplan_meier;
pub mod posterior;
pub mod shape_grid;
pub mod weibull;

pub use kaplan_meier::*;
pub use posterior::*;
pub use shape_grid::*;
pub use weibull::*;
