//! Metrics collection and registry.

use crate::analysis::StatisticsResult;
use crate::generation::GenerationResult;
use crate::verification::VerificationResult;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the generation service.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Generation metrics
    generations_total: IntCounter,
    generation_failures_total: IntCounter,
    last_generation_seconds: Gauge,

    // Verification metrics
    verifications_valid_total: IntCounter,
    verifications_invalid_total: IntCounter,
    malformed_ledgers_total: IntCounter,

    // Analysis metrics
    analyses_total: IntCounter,
    last_p_value: Gauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all service metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let generations_total = IntCounter::new(
            "randomtrust_generations_total",
            "Total number of numbers generated with a ledger",
        )?;
        let generation_failures_total = IntCounter::new(
            "randomtrust_generation_failures_total",
            "Total number of rejected generation requests",
        )?;
        let last_generation_seconds = Gauge::new(
            "randomtrust_last_generation_seconds",
            "Wall-clock duration of the latest generation",
        )?;

        let verifications_valid_total = IntCounter::new(
            "randomtrust_verifications_valid_total",
            "Total number of ledgers that verified",
        )?;
        let verifications_invalid_total = IntCounter::new(
            "randomtrust_verifications_invalid_total",
            "Total number of well-formed ledgers that failed verification",
        )?;
        let malformed_ledgers_total = IntCounter::new(
            "randomtrust_malformed_ledgers_total",
            "Total number of structurally invalid ledgers rejected",
        )?;

        let analyses_total = IntCounter::new(
            "randomtrust_analyses_total",
            "Total number of sequences analyzed",
        )?;
        let last_p_value = Gauge::new(
            "randomtrust_last_p_value",
            "Chi-square p-value of the latest analysis",
        )?;

        registry.register(Box::new(generations_total.clone()))?;
        registry.register(Box::new(generation_failures_total.clone()))?;
        registry.register(Box::new(last_generation_seconds.clone()))?;
        registry.register(Box::new(verifications_valid_total.clone()))?;
        registry.register(Box::new(verifications_invalid_total.clone()))?;
        registry.register(Box::new(malformed_ledgers_total.clone()))?;
        registry.register(Box::new(analyses_total.clone()))?;
        registry.register(Box::new(last_p_value.clone()))?;

        Ok(Self {
            registry,
            generations_total,
            generation_failures_total,
            last_generation_seconds,
            verifications_valid_total,
            verifications_invalid_total,
            malformed_ledgers_total,
            analyses_total,
            last_p_value,
        })
    }

    /// Records a successful generation.
    pub fn record_generation(&self, result: &GenerationResult) {
        self.generations_total.inc();
        self.last_generation_seconds
            .set(result.generation_time.as_secs_f64());
    }

    /// Records a rejected generation request.
    pub fn record_generation_failure(&self) {
        self.generation_failures_total.inc();
    }

    /// Records the outcome of verifying a well-formed ledger.
    pub fn record_verification(&self, result: &VerificationResult) {
        if result.is_valid {
            self.verifications_valid_total.inc();
        } else {
            self.verifications_invalid_total.inc();
        }
    }

    /// Records a ledger rejected as malformed.
    pub fn record_malformed(&self) {
        self.malformed_ledgers_total.inc();
    }

    /// Records a completed analysis.
    pub fn record_analysis(&self, result: &StatisticsResult) {
        self.analyses_total.inc();
        self.last_p_value.set(result.p_value);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("generations_total", &self.generations_total.get())
            .field("analyses_total", &self.analyses_total.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StatisticalAnalyzer;
    use crate::entropy::{EntropyBatch, EntropySource, SourceKind};
    use crate::generation::Generator;
    use crate::verification::{VerificationRequest, Verifier};

    fn generated() -> GenerationResult {
        let mut batch = EntropyBatch::new();
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            batch.push(
                SourceKind::Primary,
                EntropySource::with_timestamp(name, vec![i as u8; 16], 0, ""),
            );
        }
        Generator::default().derive(100, &batch).unwrap()
    }

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_counters_follow_outcomes() {
        let registry = MetricsRegistry::new().unwrap();
        let result = generated();
        registry.record_generation(&result);
        registry.record_generation_failure();

        let mut request = VerificationRequest::from(&result);
        let valid = Verifier::new().verify(&request).unwrap();
        registry.record_verification(&valid);
        request.claimed_number += 1;
        let invalid = Verifier::new().verify(&request).unwrap();
        registry.record_verification(&invalid);
        registry.record_malformed();

        let numbers: Vec<i64> = (0..100).collect();
        let stats = StatisticalAnalyzer::default().analyze(&numbers).unwrap();
        registry.record_analysis(&stats);

        let output = registry.encode().unwrap();
        assert!(output.contains("randomtrust_generations_total 1"));
        assert!(output.contains("randomtrust_generation_failures_total 1"));
        assert!(output.contains("randomtrust_verifications_valid_total 1"));
        assert!(output.contains("randomtrust_verifications_invalid_total 1"));
        assert!(output.contains("randomtrust_malformed_ledgers_total 1"));
        assert!(output.contains("randomtrust_analyses_total 1"));
        assert_eq!(registry.last_p_value.get(), stats.p_value);
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("randomtrust_generations_total"));
        assert!(output.contains("randomtrust_last_generation_seconds"));
        assert!(output.contains("randomtrust_last_p_value"));
    }
}
