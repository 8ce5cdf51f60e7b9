//! Entropy-chained number generation.

use crate::config::GeneratorConfig;
use crate::digest;
use crate::entropy::{EntropyBatch, EntropyCollector, EntropyQuality};
use crate::ledger::{self, LedgerBuilder, StepLedger, CHAIN_SEED};
use crate::wire::duration_secs;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Stage that records the primary entropy sources.
pub const STAGE_PRIMARY: &str = "collect primary entropy";
/// Stage that records the timing entropy sources.
pub const STAGE_TIMING: &str = "collect timing entropy";
/// Extra mixing round without new entropy.
pub const STAGE_FOLD: &str = "fold";
/// Final stage declaring the output range.
pub const STAGE_REDUCE: &str = "reduce to range";

/// Errors that can occur during generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("max_value must be a positive integer, got {max_value}")]
    InvalidRange { max_value: i64 },

    #[error("insufficient entropy: {available} distinct sources available, {required} required")]
    InsufficientEntropy { available: usize, required: usize },

    #[error("stream of {requested} numbers exceeds the limit of {limit}")]
    StreamTooLarge { requested: usize, limit: usize },
}

/// Everything a consumer needs to audit one generated number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Number in `[0, max_value)`.
    pub final_number: u64,
    /// Replayable record of every step.
    #[serde(rename = "steps")]
    pub ledger: StepLedger,
    /// Hash of the canonical ledger.
    pub verification_hash: String,
    /// Wall-clock time spent, including collection.
    #[serde(with = "duration_secs")]
    pub generation_time: Duration,
    /// Summary of the recorded sources.
    pub entropy_quality: EntropyQuality,
}

/// Drives collection, folding and reduction.
///
/// The generator holds only read-only configuration; every call is
/// independent and the fold/reduce arithmetic is a pure function of
/// the collected batch.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Creates a generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Collects entropy from `collectors` and generates a number in `[0, max_value)`.
    ///
    /// The range is checked before any entropy is collected.
    pub fn generate(
        &self,
        max_value: i64,
        collectors: &[Box<dyn EntropyCollector>],
    ) -> Result<GenerationResult, GenerationError> {
        check_range(max_value)?;

        let start = Instant::now();
        let batch = EntropyBatch::collect(collectors);
        let mut result = self.derive(max_value, &batch)?;
        result.generation_time = start.elapsed();

        Ok(result)
    }

    /// Generates a number from an already collected batch.
    ///
    /// Two calls with equal batches return equal ledgers, numbers and
    /// hashes. `generation_time` covers only this computation.
    pub fn derive(
        &self,
        max_value: i64,
        batch: &EntropyBatch,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let modulus = check_range(max_value)?;
        self.check_entropy(batch)?;

        let mut builder = LedgerBuilder::new(CHAIN_SEED);
        builder.step(
            STAGE_PRIMARY,
            format!(
                "Record {} primary entropy sources and fold their digests onto the seed",
                batch.primary.len()
            ),
            batch.primary.clone(),
        );
        builder.step(
            STAGE_TIMING,
            format!(
                "Record {} timing entropy sources and fold their digests",
                batch.timing.len()
            ),
            batch.timing.clone(),
        );
        builder.step(
            STAGE_FOLD,
            "Hash the previous result once more without new input",
            Vec::new(),
        );
        let final_number = builder.reduce(
            STAGE_REDUCE,
            format!(
                "Read the first 8 bytes of the previous result as a big-endian integer modulo {}",
                modulus
            ),
            modulus,
        );

        let ledger = builder.finish();
        let verification_hash = ledger::ledger_hash(&ledger);
        let entropy_quality = EntropyQuality::assess(ledger.sources());

        tracing::debug!(
            max_value,
            final_number,
            hash = %verification_hash,
            sources = entropy_quality.total_sources,
            "Derived number from entropy batch"
        );

        Ok(GenerationResult {
            final_number,
            ledger,
            verification_hash,
            generation_time: start.elapsed(),
            entropy_quality,
        })
    }

    /// Collects one batch and derives `count` numbers from it.
    ///
    /// Intended for feeding the statistical analyzer, not for auditing
    /// individual numbers.
    pub fn generate_stream(
        &self,
        count: usize,
        max_value: i64,
        collectors: &[Box<dyn EntropyCollector>],
    ) -> Result<Vec<u64>, GenerationError> {
        check_range(max_value)?;
        self.check_stream_count(count)?;

        let batch = EntropyBatch::collect(collectors);
        self.derive_stream(count, max_value, &batch)
    }

    /// Derives `count` numbers from a batch.
    ///
    /// Number `k` is the reduction of `SHA-256(root || k)`, where `root`
    /// is the batch folded onto the seed and `k` is 20-digit decimal.
    pub fn derive_stream(
        &self,
        count: usize,
        max_value: i64,
        batch: &EntropyBatch,
    ) -> Result<Vec<u64>, GenerationError> {
        let modulus = check_range(max_value)?;
        self.check_stream_count(count)?;
        self.check_entropy(batch)?;

        let primary = ledger::fold_sources(CHAIN_SEED, &batch.primary);
        let root = ledger::fold_sources(&primary, &batch.timing);

        let numbers = (0..count)
            .map(|k| {
                let counter = format!("{:020}", k);
                let digest = digest::sha256([root.as_bytes(), counter.as_bytes()]);
                ledger::reduce_digest(&digest, modulus)
            })
            .collect();

        tracing::debug!(count, max_value, "Derived number stream");
        Ok(numbers)
    }

    fn check_entropy(&self, batch: &EntropyBatch) -> Result<(), GenerationError> {
        let available = batch.distinct_sources();
        if available < self.config.min_sources {
            return Err(GenerationError::InsufficientEntropy {
                available,
                required: self.config.min_sources,
            });
        }
        Ok(())
    }

    fn check_stream_count(&self, count: usize) -> Result<(), GenerationError> {
        if count > self.config.max_stream_count {
            return Err(GenerationError::StreamTooLarge {
                requested: count,
                limit: self.config.max_stream_count,
            });
        }
        Ok(())
    }
}

fn check_range(max_value: i64) -> Result<NonZeroU64, GenerationError> {
    u64::try_from(max_value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or(GenerationError::InvalidRange { max_value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{default_collectors, EntropySource, SourceKind};

    fn fixed_batch() -> EntropyBatch {
        let mut batch = EntropyBatch::new();
        batch.push(
            SourceKind::Primary,
            EntropySource::with_timestamp("os-random", vec![7; 32], 1_000, "fixed"),
        );
        batch.push(
            SourceKind::Primary,
            EntropySource::with_timestamp("process-state", vec![3; 12], 1_001, "fixed"),
        );
        batch.push(
            SourceKind::Timing,
            EntropySource::with_timestamp("wall-clock", vec![9; 8], 1_002, "fixed"),
        );
        batch
    }

    #[test]
    fn test_rejects_non_positive_range() {
        let generator = Generator::default();
        for max_value in [0, -1, i64::MIN] {
            assert_eq!(
                generator.derive(max_value, &fixed_batch()),
                Err(GenerationError::InvalidRange { max_value })
            );
        }
    }

    #[test]
    fn test_rejects_insufficient_entropy() {
        let generator = Generator::new(GeneratorConfig {
            min_sources: 4,
            ..Default::default()
        });
        assert_eq!(
            generator.derive(100, &fixed_batch()),
            Err(GenerationError::InsufficientEntropy {
                available: 3,
                required: 4
            })
        );
    }

    #[test]
    fn test_ledger_has_four_stages() {
        let result = Generator::default().derive(1000, &fixed_batch()).unwrap();
        let names: Vec<_> = result.ledger.steps().iter().map(|s| s.name.as_str()).collect();

        assert_eq!(
            names,
            vec![STAGE_PRIMARY, STAGE_TIMING, STAGE_FOLD, STAGE_REDUCE]
        );
        assert_eq!(result.ledger.validate(), Ok(()));
        assert_eq!(result.ledger.last().unwrap().modulus, Some(1000));
        assert_eq!(result.ledger.last().unwrap().timestamp, 1_002);
    }

    #[test]
    fn test_final_number_matches_reduction_of_last_step() {
        let result = Generator::default().derive(1000, &fixed_batch()).unwrap();
        let last = result.ledger.last().unwrap();

        assert!(result.final_number < 1000);
        assert_eq!(
            ledger::reduce(&last.intermediate_result, 1000),
            Some(result.final_number)
        );
        assert_eq!(result.verification_hash, ledger::ledger_hash(&result.ledger));
    }

    #[test]
    fn test_derive_is_deterministic() {
        let generator = Generator::default();
        let a = generator.derive(97, &fixed_batch()).unwrap();
        let b = generator.derive(97, &fixed_batch()).unwrap();

        assert_eq!(a.final_number, b.final_number);
        assert_eq!(a.ledger, b.ledger);
        assert_eq!(a.verification_hash, b.verification_hash);
    }

    #[test]
    fn test_entropy_quality_summary() {
        let result = Generator::default().derive(10, &fixed_batch()).unwrap();
        assert_eq!(result.entropy_quality.total_sources, 3);
        assert_eq!(result.entropy_quality.total_data_size, 52);
    }

    #[test]
    fn test_generate_with_system_collectors() {
        let result = Generator::default()
            .generate(1000, &default_collectors())
            .unwrap();
        assert!(result.final_number < 1000);
        assert_eq!(result.entropy_quality.total_sources, 4);
    }

    #[test]
    fn test_invalid_range_checked_before_collection() {
        let collectors: Vec<Box<dyn EntropyCollector>> = Vec::new();
        assert_eq!(
            Generator::default().generate(0, &collectors),
            Err(GenerationError::InvalidRange { max_value: 0 })
        );
    }

    #[test]
    fn test_stream_respects_range_and_limit() {
        let generator = Generator::new(GeneratorConfig {
            max_stream_count: 100,
            ..Default::default()
        });
        let numbers = generator.derive_stream(100, 7, &fixed_batch()).unwrap();
        assert_eq!(numbers.len(), 100);
        assert!(numbers.iter().all(|&n| n < 7));

        assert_eq!(
            generator.derive_stream(101, 7, &fixed_batch()),
            Err(GenerationError::StreamTooLarge {
                requested: 101,
                limit: 100
            })
        );
    }

    #[test]
    fn test_result_serializes_with_wire_names() {
        let result = Generator::default().derive(10, &fixed_batch()).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert!(json["steps"].is_array());
        assert_eq!(json["steps"][0]["step_index"], 1);
        assert!(json["generation_time"].is_f64());

        let back: GenerationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.ledger, result.ledger);
    }
}
