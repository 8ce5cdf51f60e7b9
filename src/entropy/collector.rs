//! Entropy collector abstraction and system collectors.
//!
//! Collection is the only non-deterministic part of a generation. Each
//! collector returns one recorded [`EntropySource`]; everything after
//! that is pure arithmetic over the recorded bytes.

use super::{EntropySource, QualityLabel};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur while collecting entropy.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("entropy source {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

/// Generation stage a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Consumed by the primary collection stage.
    Primary,
    /// Consumed by the timing collection stage.
    Timing,
}

/// Catalogue entry describing a collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Name recorded on every source this collector produces.
    pub name: String,
    /// What the collector reads.
    pub description: String,
    /// Stage the source feeds.
    pub kind: SourceKind,
    /// Label expected from the collector's usual output size.
    pub expected_quality: QualityLabel,
}

/// Trait for entropy collectors.
///
/// Collectors are shared across requests, so `collect` takes `&self`.
pub trait EntropyCollector: Send + Sync {
    /// Describes this collector.
    fn info(&self) -> SourceInfo;

    /// Collects and records one source.
    fn collect(&self) -> Result<EntropySource, CollectorError>;
}

/// Operating system randomness (`getrandom`).
#[derive(Debug, Default)]
pub struct OsRandomCollector;

impl EntropyCollector for OsRandomCollector {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "os-random".into(),
            description: "32 bytes from the operating system random source".into(),
            kind: SourceKind::Primary,
            expected_quality: QualityLabel::High,
        }
    }

    fn collect(&self) -> Result<EntropySource, CollectorError> {
        let mut raw = vec![0u8; 32];
        OsRng
            .try_fill_bytes(&mut raw)
            .map_err(|e| CollectorError::Unavailable {
                name: "os-random".into(),
                reason: e.to_string(),
            })?;
        Ok(EntropySource::record(
            "os-random",
            raw,
            "Operating system random source (32 bytes)",
        ))
    }
}

/// Process identity and address-space layout.
#[derive(Debug, Default)]
pub struct ProcessStateCollector;

impl EntropyCollector for ProcessStateCollector {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "process-state".into(),
            description: "Process id, thread id, stack and heap addresses".into(),
            kind: SourceKind::Primary,
            expected_quality: QualityLabel::Medium,
        }
    }

    fn collect(&self) -> Result<EntropySource, CollectorError> {
        let pid = std::process::id();
        let stack_marker = 0u8;
        let heap_marker = Box::new(0u64);

        let mut raw = Vec::with_capacity(48);
        raw.extend_from_slice(&pid.to_be_bytes());
        raw.extend_from_slice(&(&stack_marker as *const u8 as usize as u64).to_be_bytes());
        raw.extend_from_slice(&(&*heap_marker as *const u64 as usize as u64).to_be_bytes());
        raw.extend_from_slice(format!("{:?}", std::thread::current().id()).as_bytes());

        Ok(EntropySource::record(
            "process-state",
            raw,
            format!("PID {}, thread and address-space layout", pid),
        ))
    }
}

/// Wall clock at nanosecond resolution.
#[derive(Debug, Default)]
pub struct ClockCollector;

impl EntropyCollector for ClockCollector {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "wall-clock".into(),
            description: "Current wall-clock time in nanoseconds".into(),
            kind: SourceKind::Timing,
            expected_quality: QualityLabel::Medium,
        }
    }

    fn collect(&self) -> Result<EntropySource, CollectorError> {
        let now = chrono::Utc::now();
        let nanos = now.timestamp_nanos_opt().ok_or_else(|| CollectorError::Unavailable {
            name: "wall-clock".into(),
            reason: "clock outside representable range".into(),
        })?;
        Ok(EntropySource::with_timestamp(
            "wall-clock",
            nanos.to_be_bytes().to_vec(),
            now.timestamp_millis(),
            format!("Exact time: {}", now.to_rfc3339()),
        ))
    }
}

/// Execution-time jitter of a short hashing loop.
#[derive(Debug)]
pub struct JitterCollector {
    samples: usize,
}

impl JitterCollector {
    /// Creates a collector taking `samples` timing measurements.
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
        }
    }
}

impl Default for JitterCollector {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EntropyCollector for JitterCollector {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "timing-jitter".into(),
            description: "Execution-time jitter of repeated hashing".into(),
            kind: SourceKind::Timing,
            expected_quality: QualityLabel::for_size(self.samples * 4),
        }
    }

    fn collect(&self) -> Result<EntropySource, CollectorError> {
        let mut raw = Vec::with_capacity(self.samples * 4);
        let mut scratch = [0u8; 32];
        let mut min_ns = u32::MAX;
        let mut max_ns = 0u32;

        for i in 0..self.samples {
            let start = Instant::now();
            let digest = crate::digest::sha256_hex([&scratch[..], &i.to_le_bytes()[..]]);
            scratch.copy_from_slice(&digest.as_bytes()[..32]);
            let elapsed = start.elapsed().as_nanos().min(u32::MAX as u128) as u32;

            min_ns = min_ns.min(elapsed);
            max_ns = max_ns.max(elapsed);
            raw.extend_from_slice(&elapsed.to_le_bytes());
        }

        Ok(EntropySource::record(
            "timing-jitter",
            raw,
            format!("{} samples, {}..{} ns", self.samples, min_ns, max_ns),
        ))
    }
}

/// Collector returning fixed bytes, for tests and reproducible demos.
#[derive(Debug, Clone)]
pub struct FixedCollector {
    name: String,
    kind: SourceKind,
    raw: Vec<u8>,
    timestamp: i64,
}

impl FixedCollector {
    /// Creates a collector that always records `raw` at `timestamp`.
    pub fn new(name: impl Into<String>, kind: SourceKind, raw: Vec<u8>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            kind,
            raw,
            timestamp,
        }
    }
}

impl EntropyCollector for FixedCollector {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            description: "Fixed bytes supplied by the caller".into(),
            kind: self.kind,
            expected_quality: QualityLabel::for_size(self.raw.len()),
        }
    }

    fn collect(&self) -> Result<EntropySource, CollectorError> {
        Ok(EntropySource::with_timestamp(
            self.name.clone(),
            self.raw.clone(),
            self.timestamp,
            format!("Fixed input ({} bytes)", self.raw.len()),
        ))
    }
}

/// Returns the system collectors used by default.
pub fn default_collectors() -> Vec<Box<dyn EntropyCollector>> {
    vec![
        Box::new(OsRandomCollector),
        Box::new(ProcessStateCollector),
        Box::new(ClockCollector),
        Box::new(JitterCollector::default()),
    ]
}

/// Sources gathered for one generation, split by stage.
///
/// Order within each list is collection order and is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntropyBatch {
    /// Sources for the primary collection stage.
    pub primary: Vec<EntropySource>,
    /// Sources for the timing collection stage.
    pub timing: Vec<EntropySource>,
}

impl EntropyBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every collector in order. Failed collectors are skipped.
    pub fn collect(collectors: &[Box<dyn EntropyCollector>]) -> Self {
        let mut batch = Self::new();
        for collector in collectors {
            let info = collector.info();
            match collector.collect() {
                Ok(source) => {
                    tracing::trace!(
                        source = %source.name,
                        bytes = source.data_size(),
                        "Collected entropy"
                    );
                    batch.push(info.kind, source);
                }
                Err(e) => {
                    tracing::warn!(source = %info.name, error = %e, "Entropy collection failed");
                }
            }
        }
        batch
    }

    /// Appends a source to the list for `kind`.
    pub fn push(&mut self, kind: SourceKind, source: EntropySource) {
        match kind {
            SourceKind::Primary => self.primary.push(source),
            SourceKind::Timing => self.timing.push(source),
        }
    }

    /// Iterates primary sources, then timing sources.
    pub fn sources(&self) -> impl Iterator<Item = &EntropySource> {
        self.primary.iter().chain(self.timing.iter())
    }

    /// Counts distinct source names that carry data.
    ///
    /// A source with an empty raw value contributes nothing and is not counted.
    pub fn distinct_sources(&self) -> usize {
        self.sources()
            .filter(|s| s.raw_value.as_ref().map_or(true, |raw| !raw.is_empty()))
            .map(|s| s.name.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_collectors_produce_data() {
        let batch = EntropyBatch::collect(&default_collectors());

        assert_eq!(batch.primary.len(), 2);
        assert_eq!(batch.timing.len(), 2);
        assert_eq!(batch.distinct_sources(), 4);
        assert!(batch.sources().all(|s| s.digest_matches_raw()));
    }

    #[test]
    fn test_jitter_sample_count() {
        let source = JitterCollector::new(16).collect().unwrap();
        assert_eq!(source.data_size(), 64);
    }

    #[test]
    fn test_fixed_collector_is_deterministic() {
        let collector = FixedCollector::new("fixed", SourceKind::Primary, vec![1, 2, 3], 42);
        assert_eq!(collector.collect().unwrap(), collector.collect().unwrap());
    }

    #[test]
    fn test_distinct_sources_ignores_duplicates_and_empty() {
        let mut batch = EntropyBatch::new();
        batch.push(
            SourceKind::Primary,
            EntropySource::with_timestamp("a", vec![1], 0, ""),
        );
        batch.push(
            SourceKind::Timing,
            EntropySource::with_timestamp("a", vec![2], 0, ""),
        );
        batch.push(
            SourceKind::Timing,
            EntropySource::with_timestamp("b", Vec::new(), 0, ""),
        );
        assert_eq!(batch.distinct_sources(), 1);
    }

    #[test]
    fn test_collect_preserves_order() {
        let collectors: Vec<Box<dyn EntropyCollector>> = vec![
            Box::new(FixedCollector::new("z", SourceKind::Primary, vec![1], 0)),
            Box::new(FixedCollector::new("a", SourceKind::Primary, vec![2], 0)),
        ];
        let batch = EntropyBatch::collect(&collectors);
        let names: Vec<_> = batch.primary.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}
