//! Input/output helpers.
//!
//! - posterior draw JSON read/write (`draws`)
//! - result exports (CSV/JSON) (`export`)

pub mod draws;
pub mod export;

pub use draws::*;
pub use export::*;
