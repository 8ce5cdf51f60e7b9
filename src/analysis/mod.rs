//! Statistical analysis of number sequences.
//!
//! These are sanity checks for obvious non-uniformity, not proofs of
//! randomness.

mod histogram;
mod statistics;

pub use histogram::Histogram;
pub use statistics::{AnalysisError, StatisticalAnalyzer, StatisticsResult, MIN_SAMPLES};
