//! Reporting utilities: formatted terminal output for checks, recoveries and
//! single simulated datasets.

pub mod format;

pub use format::*;
