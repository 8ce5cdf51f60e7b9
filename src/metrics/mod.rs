//! Prometheus metrics for the generation service.
//!
//! # Metrics Exposed
//!
//! ## Generation
//! - `randomtrust_generations_total` - Numbers generated with a ledger
//! - `randomtrust_generation_failures_total` - Rejected generation requests
//! - `randomtrust_last_generation_seconds` - Duration of the latest generation
//!
//! ## Verification
//! - `randomtrust_verifications_valid_total` - Ledgers that verified
//! - `randomtrust_verifications_invalid_total` - Well-formed ledgers that failed
//! - `randomtrust_malformed_ledgers_total` - Structurally invalid ledgers
//!
//! ## Analysis
//! - `randomtrust_analyses_total` - Sequences analyzed
//! - `randomtrust_last_p_value` - Chi-square p-value of the latest analysis

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
