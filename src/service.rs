//! Service facade shared by the CLI and the HTTP API.
//!
//! [`RandomTrust`] owns the configured collectors, the three engines and
//! the metrics registry. It is immutable after construction and can be
//! shared across threads behind an `Arc`.

use crate::analysis::{AnalysisError, StatisticalAnalyzer, StatisticsResult};
use crate::config::{ConfigError, FileConfig};
use crate::entropy::{default_collectors, EntropyCollector, SourceInfo};
use crate::generation::{GenerationError, GenerationResult, Generator};
use crate::metrics::{MetricsError, MetricsRegistry};
use crate::verification::{VerificationError, VerificationRequest, VerificationResult, Verifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"healthy"` when the service answers.
    pub status: String,
    /// Unix epoch milliseconds at which the probe was answered.
    pub timestamp: i64,
}

/// Auditable random number service.
pub struct RandomTrust {
    config: FileConfig,
    collectors: Vec<Box<dyn EntropyCollector>>,
    generator: Generator,
    verifier: Verifier,
    analyzer: StatisticalAnalyzer,
    metrics: MetricsRegistry,
}

impl RandomTrust {
    /// Creates a service reading entropy from the system collectors.
    pub fn new(config: FileConfig) -> Result<Self, ServiceError> {
        Self::with_collectors(config, default_collectors())
    }

    /// Creates a service reading entropy from `collectors`.
    pub fn with_collectors(
        config: FileConfig,
        collectors: Vec<Box<dyn EntropyCollector>>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        tracing::info!(
            collectors = collectors.len(),
            min_sources = config.generator.min_sources,
            bin_count = config.analysis.bin_count,
            significance = config.analysis.significance,
            "Initialized service"
        );

        Ok(Self {
            generator: Generator::new(config.generator.clone()),
            verifier: Verifier::new(),
            analyzer: StatisticalAnalyzer::new(config.analysis.clone()),
            metrics: MetricsRegistry::new()?,
            collectors,
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// Returns the metrics registry.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Generates one number in `[0, max_value)` with its ledger.
    pub fn generate(&self, max_value: i64) -> Result<GenerationResult, ServiceError> {
        match self.generator.generate(max_value, &self.collectors) {
            Ok(result) => {
                self.metrics.record_generation(&result);
                tracing::info!(
                    max_value,
                    number = result.final_number,
                    hash = %result.verification_hash,
                    "Generated number"
                );
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_generation_failure();
                tracing::warn!(max_value, error = %e, "Generation rejected");
                Err(e.into())
            }
        }
    }

    /// Generates `count` numbers in `[0, max_value)` from one entropy batch.
    pub fn generate_stream(&self, count: usize, max_value: i64) -> Result<Vec<u64>, ServiceError> {
        self.generator
            .generate_stream(count, max_value, &self.collectors)
            .map_err(|e| {
                self.metrics.record_generation_failure();
                tracing::warn!(count, max_value, error = %e, "Stream generation rejected");
                e.into()
            })
    }

    /// Verifies a claimed number against its ledger.
    pub fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, ServiceError> {
        match self.verifier.verify(request) {
            Ok(result) => {
                self.metrics.record_verification(&result);
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_malformed();
                Err(e.into())
            }
        }
    }

    /// Decodes a JSON verification request and verifies it.
    ///
    /// A body that does not decode counts as a malformed ledger.
    pub fn verify_json(&self, body: &[u8]) -> Result<VerificationResult, ServiceError> {
        match VerificationRequest::from_json(body) {
            Ok(request) => self.verify(&request),
            Err(e) => {
                self.metrics.record_malformed();
                tracing::debug!(error = %e, "Rejected undecodable verification request");
                Err(e.into())
            }
        }
    }

    /// Analyzes a sequence over its observed range.
    pub fn analyze(&self, numbers: &[i64]) -> Result<StatisticsResult, ServiceError> {
        let result = self.analyzer.analyze(numbers)?;
        self.metrics.record_analysis(&result);
        Ok(result)
    }

    /// Analyzes a sequence over the declared range `[0, max_value)`.
    pub fn analyze_in_range(
        &self,
        numbers: &[i64],
        max_value: i64,
    ) -> Result<StatisticsResult, ServiceError> {
        let result = self.analyzer.analyze_in_range(numbers, max_value)?;
        self.metrics.record_analysis(&result);
        Ok(result)
    }

    /// Describes every configured collector.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.collectors.iter().map(|c| c.info()).collect()
    }

    /// Answers a liveness probe without side effects.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl std::fmt::Debug for RandomTrust {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomTrust")
            .field("config", &self.config)
            .field("collectors", &self.sources())
            .finish_non_exhaustive()
    }
}
