//! Independent verification of generated numbers.
//!
//! The verifier shares nothing with the generator except the ledger
//! format. It can run in another process or on another machine.

mod verifier;

pub use verifier::{VerificationError, VerificationRequest, VerificationResult, Verifier};
