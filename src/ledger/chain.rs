//! Chain fold, range reduction and replay.
//!
//! # Folding Rule
//!
//! ```text
//! result[0] = "INIT"
//! result[i] = hex(SHA-256(result[i-1] || digest_1 || ... || digest_k))
//! ```
//!
//! Operands are the ASCII bytes of the hex strings, concatenated in
//! recorded order. A step with no sources folds `SHA-256(result[i-1])`.
//!
//! # Range Reduction
//!
//! The first 8 bytes of the final digest are read as a big-endian `u64`
//! and reduced modulo the declared range. For a modulus `m` that is not
//! a power of two, residues below `2^64 mod m` have one extra preimage
//! out of `floor(2^64 / m)`. The bias is left uncorrected so that any
//! verifier using this same formula reproduces the number exactly.

use super::{GenerationStep, StepLedger};
use crate::digest;
use crate::entropy::EntropySource;
use std::num::NonZeroU64;

/// Public, fixed seed that precedes the first step.
pub const CHAIN_SEED: &str = "INIT";

/// Number of digest bytes interpreted as the unsigned integer for reduction.
pub const REDUCTION_PREFIX_BYTES: usize = 8;

/// Folds digest strings onto the previous result.
pub fn fold_step<'a>(previous: &'a str, digests: impl IntoIterator<Item = &'a str>) -> String {
    digest::to_hex(&fold_raw(previous, digests))
}

/// Folds the digests of `sources`, in order, onto the previous result.
pub fn fold_sources(previous: &str, sources: &[EntropySource]) -> String {
    fold_step(previous, sources.iter().map(|s| s.digest.as_str()))
}

fn fold_raw<'a>(previous: &'a str, digests: impl IntoIterator<Item = &'a str>) -> [u8; 32] {
    digest::sha256(std::iter::once(previous).chain(digests))
}

/// Reduces raw digest bytes into `[0, modulus)`.
pub fn reduce_digest(digest: &[u8; 32], modulus: NonZeroU64) -> u64 {
    let mut word = [0u8; REDUCTION_PREFIX_BYTES];
    word.copy_from_slice(&digest[..REDUCTION_PREFIX_BYTES]);
    u64::from_be_bytes(word) % modulus.get()
}

/// Reduces a hex digest into `[0, modulus)`.
///
/// Returns `None` if the modulus is zero or the text is not a
/// full-length lower-case hex digest.
pub fn reduce(intermediate: &str, modulus: u64) -> Option<u64> {
    let modulus = NonZeroU64::new(modulus)?;
    let bytes: [u8; 32] = digest::from_hex(intermediate)?.try_into().ok()?;
    Some(reduce_digest(&bytes, modulus))
}

/// Appends steps to a ledger, folding each onto the previous result.
///
/// Step timestamps are the latest source timestamp seen so far, so a
/// ledger built from the same sources is byte-identical every time.
#[derive(Debug, Clone)]
pub struct LedgerBuilder {
    steps: Vec<GenerationStep>,
    current: String,
    clock: i64,
}

impl LedgerBuilder {
    /// Starts a ledger from `seed`.
    pub fn new(seed: &str) -> Self {
        Self {
            steps: Vec::new(),
            current: seed.to_string(),
            clock: 0,
        }
    }

    /// Returns the result of the last step (or the seed).
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Appends a step consuming `sources`.
    pub fn step(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        sources: Vec<EntropySource>,
    ) -> &GenerationStep {
        self.push(name.into(), description.into(), sources, None);
        &self.steps[self.steps.len() - 1]
    }

    /// Appends the final step, declaring the range to reduce into.
    ///
    /// Returns the number the ledger reduces to.
    pub fn reduce(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        modulus: NonZeroU64,
    ) -> u64 {
        let digest = self.push(
            name.into(),
            description.into(),
            Vec::new(),
            Some(modulus.get()),
        );
        reduce_digest(&digest, modulus)
    }

    /// Finishes the ledger.
    pub fn finish(self) -> StepLedger {
        StepLedger::from_steps(self.steps)
    }

    fn push(
        &mut self,
        name: String,
        description: String,
        sources: Vec<EntropySource>,
        modulus: Option<u64>,
    ) -> [u8; 32] {
        if let Some(latest) = sources.iter().map(|s| s.timestamp).max() {
            self.clock = self.clock.max(latest);
        }
        let digest = fold_raw(&self.current, sources.iter().map(|s| s.digest.as_str()));
        let intermediate_result = digest::to_hex(&digest);
        self.current = intermediate_result.clone();

        let step = GenerationStep {
            step_index: self.steps.len() as u32 + 1,
            name,
            description,
            entropy_sources: sources,
            intermediate_result,
            timestamp: self.clock,
            modulus,
        };

        tracing::trace!(
            step = step.step_index,
            name = %step.name,
            sources = step.entropy_sources.len(),
            result = %step.intermediate_result,
            "Folded ledger step"
        );

        self.steps.push(step);
        digest
    }
}

/// Outcome of recomputing a ledger's chain from its own inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReplay {
    /// Recomputed intermediate result for every step.
    pub recomputed: Vec<String>,
    /// Index of the first step whose recorded values disagree with its inputs.
    pub first_mismatch: Option<u32>,
}

impl ChainReplay {
    /// Returns true if every recorded value was reproduced.
    pub fn is_intact(&self) -> bool {
        self.first_mismatch.is_none()
    }

    /// Returns the recomputed final result.
    pub fn final_result(&self) -> Option<&str> {
        self.recomputed.last().map(String::as_str)
    }
}

/// Recomputes every step from the seed and the declared digests.
///
/// Each step is folded from the *recomputed* previous result, never the
/// recorded one, so a single forged value anywhere breaks every later
/// step. A source whose raw bytes do not hash to its digest also counts
/// as a mismatch at that step.
pub fn replay(ledger: &StepLedger) -> ChainReplay {
    let mut recomputed = Vec::with_capacity(ledger.len());
    let mut first_mismatch = None;
    let mut current = CHAIN_SEED.to_string();

    for step in ledger.steps() {
        current = fold_sources(&current, &step.entropy_sources);

        let raw_ok = step.entropy_sources.iter().all(EntropySource::digest_matches_raw);
        if first_mismatch.is_none() && (!raw_ok || current != step.intermediate_result) {
            first_mismatch = Some(step.step_index);
        }
        recomputed.push(current.clone());
    }

    ChainReplay {
        recomputed,
        first_mismatch,
    }
}
