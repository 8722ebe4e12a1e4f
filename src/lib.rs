//! `survsim` library crate.
//!
//! The binary (`survsim`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the replicate pipeline can be driven by an external inference engine
//!   that only hands over parameter draws
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod replicate;
pub mod report;
