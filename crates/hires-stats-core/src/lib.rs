//! hires-stats-core: statistical engine for daily hire counts and policy
//! indicators
//!
//! Year-stratified outlier filtering, ordered categorical aggregation, OLS
//! with categorical and interaction terms, nested F-tests, estimated
//! marginal means with pairwise contrasts, Welch tests and Pearson
//! correlation matrices. Every operation takes its inputs by reference and
//! returns a new artifact.

pub mod data;
pub mod diagnostics;
pub mod errors;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod tests;
pub mod types;

pub use errors::{StatsError, StatsResult};
pub use types::*;
