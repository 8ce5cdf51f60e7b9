//! Generation steps and the step ledger.

use crate::digest;
use crate::entropy::EntropySource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One stage of a generation.
///
/// `intermediate_result` is a pure function of the previous step's
/// result and this step's entropy digests; see [`super::fold_sources`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStep {
    /// 1-based position in the ledger.
    #[serde(alias = "step")]
    pub step_index: u32,
    /// Stage name.
    pub name: String,
    /// Human readable description.
    pub description: String,
    /// Sources consumed by this step, in collection order.
    #[serde(default)]
    pub entropy_sources: Vec<EntropySource>,
    /// Lower-case hex digest after folding this step.
    pub intermediate_result: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Range the final number is reduced into. Only the final step carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<u64>,
}

/// Structural defect in a ledger.
///
/// A defect means the input is garbage, as opposed to a well-formed
/// ledger that simply fails to verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerDefect {
    #[error("ledger could not be decoded: {0}")]
    Undecodable(String),

    #[error("ledger has no steps")]
    Empty,

    #[error("step at position {position} has index {found}, expected {expected}")]
    StepIndex {
        position: usize,
        expected: u32,
        found: u32,
    },

    #[error("step {step} has an empty name")]
    MissingName { step: u32 },

    #[error("step {step} intermediate result is not a {len}-character lower-case hex digest")]
    InvalidIntermediate { step: u32, len: usize },

    #[error("step {step} source {position} has an empty name")]
    MissingSourceName { step: u32, position: usize },

    #[error("step {step} source {position} digest is not lower-case hex")]
    InvalidDigest { step: u32, position: usize },

    #[error("final step does not declare a modulus")]
    MissingModulus,

    #[error("step {step} declares a zero modulus")]
    ZeroModulus { step: u32 },

    #[error("step {step} declares a modulus but is not the final step")]
    MisplacedModulus { step: u32 },
}

/// Ordered, replayable record of all generation steps.
///
/// Deserialization does not validate; call [`StepLedger::validate`]
/// before trusting the structure of a ledger from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLedger {
    steps: Vec<GenerationStep>,
}

impl StepLedger {
    /// Wraps steps without validating them.
    pub fn from_steps(steps: Vec<GenerationStep>) -> Self {
        Self { steps }
    }

    /// Returns the steps in ledger order.
    #[inline]
    pub fn steps(&self) -> &[GenerationStep] {
        &self.steps
    }

    /// Consumes the ledger, returning its steps.
    pub fn into_steps(self) -> Vec<GenerationStep> {
        self.steps
    }

    /// Returns the number of steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the ledger has no steps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the final step.
    pub fn last(&self) -> Option<&GenerationStep> {
        self.steps.last()
    }

    /// Iterates every recorded source in ledger order.
    pub fn sources(&self) -> impl Iterator<Item = &EntropySource> {
        self.steps.iter().flat_map(|s| s.entropy_sources.iter())
    }

    /// Checks every structural invariant.
    ///
    /// Indices must run 1, 2, 3, ... with no gaps. Names must be present,
    /// digests must be lower-case hex and intermediate results full-length
    /// digests. Exactly the final step declares a non-zero modulus.
    pub fn validate(&self) -> Result<(), LedgerDefect> {
        if self.steps.is_empty() {
            return Err(LedgerDefect::Empty);
        }

        let last_position = self.steps.len() - 1;
        for (position, step) in self.steps.iter().enumerate() {
            let expected = position as u32 + 1;
            if step.step_index != expected {
                return Err(LedgerDefect::StepIndex {
                    position,
                    expected,
                    found: step.step_index,
                });
            }
            let index = step.step_index;

            if step.name.trim().is_empty() {
                return Err(LedgerDefect::MissingName { step: index });
            }
            if !digest::is_digest(&step.intermediate_result) {
                return Err(LedgerDefect::InvalidIntermediate {
                    step: index,
                    len: digest::DIGEST_HEX_LEN,
                });
            }

            for (source_pos, source) in step.entropy_sources.iter().enumerate() {
                if source.name.trim().is_empty() {
                    return Err(LedgerDefect::MissingSourceName {
                        step: index,
                        position: source_pos,
                    });
                }
                if !digest::is_lower_hex(&source.digest) {
                    return Err(LedgerDefect::InvalidDigest {
                        step: index,
                        position: source_pos,
                    });
                }
            }

            match step.modulus {
                Some(0) => return Err(LedgerDefect::ZeroModulus { step: index }),
                Some(_) if position != last_position => {
                    return Err(LedgerDefect::MisplacedModulus { step: index })
                }
                None if position == last_position => return Err(LedgerDefect::MissingModulus),
                _ => {}
            }
        }

        Ok(())
    }
}
