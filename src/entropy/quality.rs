//! Qualitative scoring of collected entropy.
//!
//! Labels are a byte-length heuristic, not a measurement of min-entropy.

use super::EntropySource;
use serde::{Deserialize, Serialize};

/// Byte length at or above which a source is labelled [`QualityLabel::High`].
pub const HIGH_QUALITY_BYTES: usize = 32;

/// Byte length at or above which a source is labelled [`QualityLabel::Medium`].
pub const MEDIUM_QUALITY_BYTES: usize = 8;

/// Qualitative label for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    /// Fewer than 8 raw bytes.
    Low,
    /// 8 to 31 raw bytes.
    Medium,
    /// 32 or more raw bytes.
    High,
}

impl QualityLabel {
    /// Scores a source by its raw data size.
    pub fn for_size(bytes: usize) -> Self {
        if bytes >= HIGH_QUALITY_BYTES {
            Self::High
        } else if bytes >= MEDIUM_QUALITY_BYTES {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Summary of the entropy that went into one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntropyQuality {
    /// Number of sources recorded.
    pub total_sources: usize,
    /// Sum of raw bytes over all sources.
    pub total_data_size: usize,
    /// One label per source, in collection order.
    pub sources_quality: Vec<QualityLabel>,
}

impl EntropyQuality {
    /// Assesses sources in the order given.
    pub fn assess<'a>(sources: impl IntoIterator<Item = &'a EntropySource>) -> Self {
        let mut quality = Self {
            total_sources: 0,
            total_data_size: 0,
            sources_quality: Vec::new(),
        };
        for source in sources {
            let size = source.data_size();
            quality.total_sources += 1;
            quality.total_data_size += size;
            quality.sources_quality.push(QualityLabel::for_size(size));
        }
        quality
    }
}
