//! Reviewer matching, workload limits, and review consensus for manuscript peer review.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
