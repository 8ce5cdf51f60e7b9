//! Entropy collection and recording.
//!
//! This module gathers raw unpredictable data from the host and records
//! each piece as an [`EntropySource`] with its digest. Collectors are
//! treated as untrusted inputs: their bytes are recorded verbatim so a
//! third party can later re-derive the generation from the ledger.

mod collector;
mod quality;
mod source;

pub use collector::{
    default_collectors, ClockCollector, CollectorError, EntropyBatch, EntropyCollector,
    FixedCollector, JitterCollector, OsRandomCollector, ProcessStateCollector, SourceInfo,
    SourceKind,
};
pub use quality::{EntropyQuality, QualityLabel, HIGH_QUALITY_BYTES, MEDIUM_QUALITY_BYTES};
pub use source::EntropySource;
