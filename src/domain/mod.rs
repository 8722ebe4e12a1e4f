//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - posterior parameter draws (`ParameterDraw`) and the derived Weibull scale
//! - time-to-event records (`Subject`, `Dataset`)
//! - estimator and aggregator outputs (`CurvePoint`, `AggregatedBand`)
//! - run configuration (`SimConfig`, `PolicyKind`, `CensoringPolicy`)

pub mod types;

pub use types::*;
