//! RandomTrust: auditable random number generation.
//!
//! Every generated number comes with a ledger of the steps that produced
//! it. Anyone holding the ledger can replay the computation from its own
//! inputs and confirm the number without trusting the generator.
//!
//! # Architecture
//!
//! ```text
//! entropy → generation → ledger ─┬→ verification
//!                                 └→ (number stream) → analysis
//! ```
//!
//! # Design Principles
//!
//! - **Transparency over secrecy**: the chain seed is a public constant
//! - **Replay, don't recheck**: verification recomputes every step
//! - **Pinned format**: SHA-256 and the canonical encoding are part of
//!   ledger format `v1`
//! - **No randomness claims**: the chi-square test only fails to reject
//!
//! # Example
//!
//! ```no_run
//! use randomtrust::{
//!     entropy::default_collectors,
//!     generation::Generator,
//!     verification::{VerificationRequest, Verifier},
//! };
//!
//! let result = Generator::default()
//!     .generate(1000, &default_collectors())
//!     .unwrap();
//!
//! let verdict = Verifier::new()
//!     .verify(&VerificationRequest::from(&result))
//!     .unwrap();
//! assert!(verdict.is_valid);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod digest;
pub mod entropy;
pub mod generation;
pub mod ledger;
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod verification;
mod wire;

// Re-export commonly used types at crate root
pub use analysis::{AnalysisError, StatisticalAnalyzer, StatisticsResult};
pub use config::FileConfig;
pub use entropy::{EntropyBatch, EntropyCollector, EntropySource};
pub use generation::{GenerationError, GenerationResult, Generator};
pub use ledger::{GenerationStep, LedgerDefect, StepLedger};
pub use service::{RandomTrust, ServiceError};
pub use verification::{VerificationError, VerificationRequest, VerificationResult, Verifier};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
