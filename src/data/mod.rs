//! Synthetic time-to-event data generation.

pub mod censoring;

pub use censoring::*;
