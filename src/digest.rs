//! Pinned digest primitive for ledger format `v1`.
//!
//! Every hash in a ledger (entropy digests, chain fold, ledger hash)
//! goes through this module so the generator and the verifier can never
//! disagree on the algorithm. The algorithm is part of the ledger format
//! and is not configurable.

use sha2::{Digest, Sha256};

/// Name of the pinned hash algorithm.
pub const HASH_ALGORITHM: &str = "sha256";

/// Length of a lower-case hex digest produced by [`HASH_ALGORITHM`].
pub const DIGEST_HEX_LEN: usize = 64;

/// Hashes the concatenation of `parts`.
pub fn sha256<I, T>(parts: I) -> [u8; 32]
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hasher.finalize().into()
}

/// Hashes the concatenation of `parts` and returns the lower-case hex digest.
pub fn sha256_hex<I, T>(parts: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    to_hex(&sha256(parts))
}

/// Encodes bytes as lower-case hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes lower-case hex. Returns `None` on odd length or any other character.
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    if !is_lower_hex(s) {
        return None;
    }
    hex::decode(s).ok()
}

/// Returns true if `s` is non-empty and contains only `0-9a-f`.
pub fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Returns true if `s` is a full-length digest of the pinned algorithm.
pub fn is_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && is_lower_hex(s)
}
