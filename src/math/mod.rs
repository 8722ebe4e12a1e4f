//! Numerical utilities: empirical quantiles and one-dimensional integration.

pub mod integrate;
pub mod quantile;

pub use integrate::*;
pub use quantile::*;
