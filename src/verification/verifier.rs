//! Replay verification of generated numbers.

use crate::generation::GenerationResult;
use crate::ledger::{self, LedgerDefect, StepLedger};
use crate::wire::duration_secs;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur during verification.
///
/// A forged ledger is not an error; it yields a result with
/// `is_valid == false`. Only structurally broken input is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("malformed ledger: {0}")]
    MalformedLedger(#[from] LedgerDefect),
}

/// Untrusted claim to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Number the producer claims was generated.
    #[serde(rename = "number", alias = "claimed_number", alias = "final_number")]
    pub claimed_number: i64,
    /// Ledger the producer claims it was generated from.
    #[serde(rename = "steps", alias = "ledger")]
    pub ledger: StepLedger,
    /// Hash the producer claims for the ledger.
    #[serde(rename = "verification_hash", alias = "claimed_hash")]
    pub claimed_hash: String,
}

impl VerificationRequest {
    /// Decodes a request from JSON.
    ///
    /// Missing or mistyped fields are reported as a malformed ledger,
    /// the same as any other structural defect.
    pub fn from_json(body: &[u8]) -> Result<Self, VerificationError> {
        serde_json::from_slice(body).map_err(|e| {
            VerificationError::MalformedLedger(LedgerDefect::Undecodable(e.to_string()))
        })
    }
}

impl From<&GenerationResult> for VerificationRequest {
    fn from(result: &GenerationResult) -> Self {
        Self {
            claimed_number: result.final_number as i64,
            ledger: result.ledger.clone(),
            claimed_hash: result.verification_hash.clone(),
        }
    }
}

/// Outcome of replaying a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Hash matches, every step replays, and the number re-derives.
    pub is_valid: bool,
    /// Hash recomputed from the supplied ledger.
    pub calculated_hash: String,
    /// Hash supplied by the caller.
    pub provided_hash: String,
    /// Time spent on the verification computation.
    #[serde(with = "duration_secs")]
    pub verification_time: Duration,
    /// Every recorded intermediate result matched its recomputation.
    pub chain_intact: bool,
    /// First step whose recorded values disagree with its inputs.
    pub first_mismatched_step: Option<u32>,
    /// Number re-derived from the recomputed chain.
    pub derived_number: u64,
    /// `derived_number` equals the claimed number.
    pub number_matches: bool,
}

/// Recomputes a ledger from its own inputs and checks every claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    /// Creates a verifier.
    pub fn new() -> Self {
        Self
    }

    /// Verifies a claimed number, ledger and hash.
    ///
    /// Recorded intermediate results are never trusted: the chain is
    /// recomputed from the seed and each step's declared digests, and
    /// the number is re-derived from the recomputed final digest.
    pub fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerificationError> {
        let start = Instant::now();

        if let Err(defect) = request.ledger.validate() {
            tracing::debug!(defect = %defect, "Rejected malformed ledger");
            return Err(defect.into());
        }

        let replay = ledger::replay(&request.ledger);
        let calculated_hash = ledger::ledger_hash(&request.ledger);

        let modulus = request
            .ledger
            .last()
            .and_then(|step| step.modulus)
            .ok_or(LedgerDefect::MissingModulus)?;
        let derived_number = replay
            .final_result()
            .and_then(|result| ledger::reduce(result, modulus))
            .ok_or(LedgerDefect::MissingModulus)?;

        let hash_matches = calculated_hash == request.claimed_hash;
        let number_matches = i64::try_from(derived_number)
            .map_or(false, |n| n == request.claimed_number);
        let is_valid = hash_matches && replay.is_intact() && number_matches;

        if is_valid {
            tracing::debug!(number = derived_number, hash = %calculated_hash, "Ledger verified");
        } else {
            tracing::warn!(
                hash_matches,
                chain_intact = replay.is_intact(),
                first_mismatched_step = ?replay.first_mismatch,
                number_matches,
                "Ledger failed verification"
            );
        }

        Ok(VerificationResult {
            is_valid,
            calculated_hash,
            provided_hash: request.claimed_hash.clone(),
            verification_time: start.elapsed(),
            chain_intact: replay.is_intact(),
            first_mismatched_step: replay.first_mismatch,
            derived_number,
            number_matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{EntropyBatch, EntropySource, SourceKind};
    use crate::generation::Generator;

    fn generated() -> GenerationResult {
        let mut batch = EntropyBatch::new();
        batch.push(
            SourceKind::Primary,
            EntropySource::with_timestamp("a", vec![1; 32], 10, ""),
        );
        batch.push(
            SourceKind::Primary,
            EntropySource::with_timestamp("b", vec![2; 16], 11, ""),
        );
        batch.push(
            SourceKind::Timing,
            EntropySource::with_timestamp("c", vec![3; 8], 12, ""),
        );
        Generator::default().derive(1000, &batch).unwrap()
    }

    /// Replaces the first character of `s` with a different hex digit.
    fn flip_hex(s: &str) -> String {
        let replacement = if s.starts_with('0') { "1" } else { "0" };
        format!("{}{}", replacement, &s[1..])
    }

    #[test]
    fn test_round_trip_is_valid() {
        let result = generated();
        let verified = Verifier::new()
            .verify(&VerificationRequest::from(&result))
            .unwrap();

        assert!(verified.is_valid);
        assert!(verified.chain_intact);
        assert_eq!(verified.derived_number, result.final_number);
        assert_eq!(verified.calculated_hash, result.verification_hash);
    }

    #[test]
    fn test_wrong_number_is_invalid() {
        let result = generated();
        let mut request = VerificationRequest::from(&result);
        request.claimed_number = (result.final_number as i64 + 1) % 1000;

        let verified = Verifier::new().verify(&request).unwrap();
        assert!(!verified.is_valid);
        assert!(!verified.number_matches);
        assert!(verified.chain_intact);
    }

    #[test]
    fn test_negative_claim_is_invalid_not_error() {
        let mut request = VerificationRequest::from(&generated());
        request.claimed_number = -1;
        assert!(!Verifier::new().verify(&request).unwrap().is_valid);
    }

    #[test]
    fn test_tampered_hash_is_invalid() {
        let mut request = VerificationRequest::from(&generated());
        request.claimed_hash = flip_hex(&request.claimed_hash);

        let verified = Verifier::new().verify(&request).unwrap();
        assert!(!verified.is_valid);
        assert!(verified.chain_intact);
        assert_ne!(verified.calculated_hash, verified.provided_hash);
    }

    #[test]
    fn test_forged_intermediate_detected_even_with_matching_hash() {
        let result = generated();
        let mut steps = result.ledger.clone().into_steps();
        steps[2].intermediate_result = flip_hex(&steps[2].intermediate_result);
        let ledger = StepLedger::from_steps(steps);

        // The forger recomputes the ledger hash so the hash check passes.
        let request = VerificationRequest {
            claimed_number: result.final_number as i64,
            claimed_hash: ledger::ledger_hash(&ledger),
            ledger,
        };

        let verified = Verifier::new().verify(&request).unwrap();
        assert!(!verified.is_valid);
        assert!(!verified.chain_intact);
        assert_eq!(verified.first_mismatched_step, Some(3));
    }

    #[test]
    fn test_swapped_digest_detected() {
        let result = generated();
        let mut steps = result.ledger.clone().into_steps();
        let source = &mut steps[0].entropy_sources[1];
        source.raw_value = None;
        source.digest = flip_hex(&source.digest);
        let ledger = StepLedger::from_steps(steps);

        let request = VerificationRequest {
            claimed_number: result.final_number as i64,
            claimed_hash: ledger::ledger_hash(&ledger),
            ledger,
        };

        let verified = Verifier::new().verify(&request).unwrap();
        assert!(!verified.is_valid);
        assert_eq!(verified.first_mismatched_step, Some(1));
    }

    #[test]
    fn test_malformed_ledger_is_error() {
        let mut request = VerificationRequest::from(&generated());
        request.ledger = StepLedger::default();

        assert_eq!(
            Verifier::new().verify(&request),
            Err(VerificationError::MalformedLedger(LedgerDefect::Empty))
        );
    }

    #[test]
    fn test_missing_step_field_is_malformed() {
        let json = serde_json::to_value(VerificationRequest::from(&generated())).unwrap();
        let mut broken = json.clone();
        broken["steps"][1]
            .as_object_mut()
            .unwrap()
            .remove("intermediate_result");
        let body = serde_json::to_vec(&broken).unwrap();

        match VerificationRequest::from_json(&body) {
            Err(VerificationError::MalformedLedger(LedgerDefect::Undecodable(detail))) => {
                assert!(detail.contains("intermediate_result"));
            }
            other => panic!("expected malformed ledger, got {:?}", other),
        }

        let body = serde_json::to_vec(&json).unwrap();
        assert!(VerificationRequest::from_json(&body).is_ok());
    }

    #[test]
    fn test_non_hex_digest_is_malformed_not_invalid() {
        let result = generated();
        let mut steps = result.ledger.clone().into_steps();
        let source = &mut steps[0].entropy_sources[0];
        source.digest = source.digest.to_uppercase();
        let ledger = StepLedger::from_steps(steps);

        let request = VerificationRequest {
            claimed_number: result.final_number as i64,
            claimed_hash: ledger::ledger_hash(&ledger),
            ledger,
        };
        assert_eq!(
            Verifier::new().verify(&request),
            Err(VerificationError::MalformedLedger(LedgerDefect::InvalidDigest {
                step: 1,
                position: 0
            }))
        );
    }

    #[test]
    fn test_request_uses_wire_names() {
        let request = VerificationRequest::from(&generated());
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("number").is_some());
        assert!(json.get("steps").is_some());
        assert!(json.get("verification_hash").is_some());

        let back: VerificationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }
}
