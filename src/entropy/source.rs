//! Recorded entropy source type.

use crate::digest;
use crate::wire::hex_bytes;
use serde::{Deserialize, Serialize};

/// One named piece of raw data that contributed unpredictability.
///
/// The `digest` is what enters the chain fold. `raw_value` may be
/// withheld on the wire; when present it must hash to `digest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntropySource {
    /// Source identifier.
    pub name: String,
    /// Raw collected bytes, lower-case hex on the wire.
    #[serde(
        default,
        with = "hex_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_value: Option<Vec<u8>>,
    /// Lower-case hex digest of `raw_value`.
    pub digest: String,
    /// Collection time, Unix epoch milliseconds.
    pub timestamp: i64,
    /// Human readable description.
    pub description: String,
}

impl EntropySource {
    /// Records raw bytes collected now.
    pub fn record(name: impl Into<String>, raw: Vec<u8>, description: impl Into<String>) -> Self {
        Self::with_timestamp(name, raw, chrono::Utc::now().timestamp_millis(), description)
    }

    /// Records raw bytes with an explicit timestamp.
    pub fn with_timestamp(
        name: impl Into<String>,
        raw: Vec<u8>,
        timestamp: i64,
        description: impl Into<String>,
    ) -> Self {
        let digest = digest::sha256_hex([&raw]);
        Self {
            name: name.into(),
            raw_value: Some(raw),
            digest,
            timestamp,
            description: description.into(),
        }
    }

    /// Builds a source whose raw bytes are withheld and only the digest is known.
    pub fn from_digest(
        name: impl Into<String>,
        digest: impl Into<String>,
        timestamp: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            raw_value: None,
            digest: digest.into(),
            timestamp,
            description: description.into(),
        }
    }

    /// Number of raw bytes recorded (0 when withheld).
    pub fn data_size(&self) -> usize {
        self.raw_value.as_ref().map_or(0, Vec::len)
    }

    /// Returns false only when raw bytes are present and do not hash to `digest`.
    pub fn digest_matches_raw(&self) -> bool {
        match &self.raw_value {
            Some(raw) => digest::sha256_hex([raw]) == self.digest,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_sha256_of_raw() {
        let source = EntropySource::with_timestamp("clock", b"abc".to_vec(), 1, "test");
        assert_eq!(
            source.digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(source.digest_matches_raw());
        assert_eq!(source.data_size(), 3);
    }

    #[test]
    fn test_withheld_raw_always_matches() {
        let source = EntropySource::from_digest("external", "aa", 0, "digest only");
        assert!(source.digest_matches_raw());
        assert_eq!(source.data_size(), 0);
    }

    #[test]
    fn test_tampered_raw_detected() {
        let mut source = EntropySource::with_timestamp("clock", vec![1, 2, 3], 1, "test");
        source.raw_value = Some(vec![1, 2, 4]);
        assert!(!source.digest_matches_raw());
    }

    #[test]
    fn test_raw_value_serialized_as_hex() {
        let source = EntropySource::with_timestamp("clock", vec![0xde, 0xad], 7, "test");
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["raw_value"], "dead");

        let back: EntropySource = serde_json::from_value(json).unwrap();
        assert_eq!(back, source);
    }
}
