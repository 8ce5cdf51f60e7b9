//! Uniformity statistics for number sequences.
//!
//! The chi-square test here is a heuristic classifier. `is_random`
//! means uniformity was not rejected at the configured significance,
//! never that the sequence is proven random.

use super::histogram::Histogram;
use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use thiserror::Error;

/// Smallest sample accepted for analysis.
pub const MIN_SAMPLES: usize = 10;

/// Errors that can occur during analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("at least {min} numbers are required for analysis, got {got}")]
    InsufficientSamples { got: usize, min: usize },

    #[error("declared max_value must be positive, got {max_value}")]
    InvalidRange { max_value: i64 },

    #[error("value {value} lies outside the declared range [0, {max_value})")]
    ValueOutOfRange { value: i64, max_value: u64 },

    #[error("chi-square distribution unavailable: {0}")]
    Distribution(String),
}

/// Distributional statistics of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResult {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population variance (divisor N).
    pub variance: f64,
    /// Pearson chi-square statistic against a uniform histogram.
    pub chi_square: f64,
    /// Upper-tail probability of `chi_square` with `bins - 1` degrees of freedom.
    pub p_value: f64,
    /// Count per bin.
    pub histogram_data: Vec<u64>,
    /// `p_value` above the significance threshold.
    pub is_random: bool,
    /// Number of values analyzed.
    pub sample_size: usize,
    /// Degrees of freedom of the chi-square test.
    pub degrees_of_freedom: usize,
}

/// Scores sequences for uniformity.
#[derive(Debug, Clone, Default)]
pub struct StatisticalAnalyzer {
    config: AnalysisConfig,
}

impl StatisticalAnalyzer {
    /// Creates an analyzer with the given configuration.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes a sequence, binning over its observed range.
    pub fn analyze(&self, numbers: &[i64]) -> Result<StatisticsResult, AnalysisError> {
        check_sample_size(numbers)?;
        let histogram = Histogram::observed(numbers, self.effective_bins(numbers.len()));
        self.score(numbers, histogram)
    }

    /// Analyzes a sequence known to lie in `[0, max_value)`.
    pub fn analyze_in_range(
        &self,
        numbers: &[i64],
        max_value: i64,
    ) -> Result<StatisticsResult, AnalysisError> {
        check_sample_size(numbers)?;
        let max_value = u64::try_from(max_value)
            .ok()
            .filter(|&m| m > 0)
            .ok_or(AnalysisError::InvalidRange { max_value })?;

        let histogram = Histogram::declared(numbers, self.effective_bins(numbers.len()), max_value)
            .map_err(|value| AnalysisError::ValueOutOfRange { value, max_value })?;
        self.score(numbers, histogram)
    }

    /// Bin count capped at the sample size, so every expected count is at least 1.
    fn effective_bins(&self, samples: usize) -> usize {
        self.config.bin_count.min(samples).max(2)
    }

    fn score(
        &self,
        numbers: &[i64],
        histogram: Histogram,
    ) -> Result<StatisticsResult, AnalysisError> {
        let n = numbers.len() as f64;
        let mean = numbers.iter().map(|&x| x as f64).sum::<f64>() / n;
        let variance = numbers
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / n;

        let chi_square = histogram.chi_square();
        let degrees_of_freedom = histogram.bin_count() - 1;
        let distribution = ChiSquared::new(degrees_of_freedom as f64)
            .map_err(|e| AnalysisError::Distribution(e.to_string()))?;
        let p_value = distribution.sf(chi_square);
        let is_random = p_value > self.config.significance;

        tracing::debug!(
            samples = numbers.len(),
            mean,
            variance,
            chi_square,
            p_value,
            is_random,
            "Analyzed sequence"
        );

        Ok(StatisticsResult {
            mean,
            variance,
            chi_square,
            p_value,
            histogram_data: histogram.into_counts(),
            is_random,
            sample_size: numbers.len(),
            degrees_of_freedom,
        })
    }
}

fn check_sample_size(numbers: &[i64]) -> Result<(), AnalysisError> {
    if numbers.len() < MIN_SAMPLES {
        return Err(AnalysisError::InsufficientSamples {
            got: numbers.len(),
            min: MIN_SAMPLES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_samples_rejected() {
        let analyzer = StatisticalAnalyzer::default();
        assert_eq!(
            analyzer.analyze(&[1, 2, 3]),
            Err(AnalysisError::InsufficientSamples { got: 3, min: 10 })
        );
        assert!(analyzer.analyze(&[0; 9]).is_err());
        assert!(analyzer.analyze(&[0; 10]).is_ok());
    }

    #[test]
    fn test_population_mean_and_variance() {
        let numbers: Vec<i64> = (1..=10).collect();
        let stats = StatisticalAnalyzer::default().analyze(&numbers).unwrap();

        assert!((stats.mean - 5.5).abs() < 1e-12);
        // Population variance of 1..=10 is 8.25 (sample variance would be 9.1667).
        assert!((stats.variance - 8.25).abs() < 1e-12);
    }

    #[test]
    fn test_perfectly_uniform_sequence() {
        let numbers: Vec<i64> = (0..1000).map(|i| i % 100).collect();
        let stats = StatisticalAnalyzer::default()
            .analyze_in_range(&numbers, 100)
            .unwrap();

        assert_eq!(stats.histogram_data, vec![100; 10]);
        assert_eq!(stats.chi_square, 0.0);
        assert!((stats.p_value - 1.0).abs() < 1e-9);
        assert!(stats.is_random);
        assert_eq!(stats.degrees_of_freedom, 9);
    }

    #[test]
    fn test_large_offset_sequence_matches_unshifted() {
        let base: Vec<i64> = (0..1000).map(|i| i % 100).collect();
        let shifted: Vec<i64> = base.iter().map(|&x| (1i64 << 60) + x).collect();
        let analyzer = StatisticalAnalyzer::default();

        let a = analyzer.analyze(&base).unwrap();
        let b = analyzer.analyze(&shifted).unwrap();
        assert_eq!(b.histogram_data, vec![100; 10]);
        assert_eq!(a.histogram_data, b.histogram_data);
        assert_eq!(b.chi_square, 0.0);
        assert!(b.is_random);
    }

    #[test]
    fn test_constant_sequence_not_random() {
        let stats = StatisticalAnalyzer::default().analyze(&[42; 100]).unwrap();

        assert_eq!(stats.variance, 0.0);
        // All 100 values in one bin: chi-square = 900.
        assert!((stats.chi_square - 900.0).abs() < 1e-9);
        assert!(stats.p_value < 1e-10);
        assert!(!stats.is_random);
    }

    #[test]
    fn test_bins_capped_by_sample_size() {
        let analyzer = StatisticalAnalyzer::new(AnalysisConfig {
            bin_count: 50,
            ..Default::default()
        });
        let numbers: Vec<i64> = (0..12).collect();
        let stats = analyzer.analyze(&numbers).unwrap();

        assert_eq!(stats.histogram_data.len(), 12);
        assert_eq!(stats.degrees_of_freedom, 11);
    }

    #[test]
    fn test_declared_range_rejects_outliers() {
        let numbers: Vec<i64> = (0..20).collect();
        assert_eq!(
            StatisticalAnalyzer::default().analyze_in_range(&numbers, 10),
            Err(AnalysisError::ValueOutOfRange {
                value: 10,
                max_value: 10
            })
        );
        assert_eq!(
            StatisticalAnalyzer::default().analyze_in_range(&numbers, 0),
            Err(AnalysisError::InvalidRange { max_value: 0 })
        );
    }

    #[test]
    fn test_significance_threshold_applies() {
        // Mildly skewed: 20 values in the first bin, 10 in the others except one with 0.
        let mut numbers = Vec::new();
        for bin in 0..10i64 {
            let count = match bin {
                0 => 20,
                9 => 0,
                _ => 10,
            };
            numbers.extend(std::iter::repeat(bin * 10).take(count));
        }
        let lenient = StatisticalAnalyzer::new(AnalysisConfig {
            significance: 1e-6,
            ..Default::default()
        });
        let strict = StatisticalAnalyzer::new(AnalysisConfig {
            significance: 0.5,
            ..Default::default()
        });

        let a = lenient.analyze_in_range(&numbers, 100).unwrap();
        let b = strict.analyze_in_range(&numbers, 100).unwrap();
        assert_eq!(a.p_value, b.p_value);
        assert!(a.is_random);
        assert!(!b.is_random);
    }
}
