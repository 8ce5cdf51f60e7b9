//! Canonical ledger encoding and the verification hash.
//!
//! # Format `randomtrust-ledger/v1`
//!
//! ```text
//! randomtrust-ledger/v1
//! step|<index:10>|<n>:<name>|<n>:<description>|<timestamp:±19>|<n>:<result>|<modulus:20 or ->|<sources:10>
//! source|<n>:<name>|<n>:<digest>|<timestamp:±19>|<n>:<description>|<n>:<raw hex or ->
//! ```
//!
//! Every string is prefixed by its byte length so no field value can
//! imitate a delimiter. Integers are fixed-width decimal and never go
//! through locale-aware formatting. Steps appear in ledger order and
//! sources in recorded order; nothing is sorted.

use super::StepLedger;
use crate::digest;
use std::fmt::Write;

/// Format identifier written as the first line of every canonical ledger.
pub const LEDGER_FORMAT: &str = "randomtrust-ledger/v1";

/// Encodes a ledger into its canonical byte form.
pub fn canonicalize(ledger: &StepLedger) -> Vec<u8> {
    let mut out = String::with_capacity(256 * (ledger.len() + 1));
    out.push_str(LEDGER_FORMAT);
    out.push('\n');

    for step in ledger.steps() {
        out.push_str("step|");
        let _ = write!(out, "{:010}|", step.step_index);
        push_str_field(&mut out, &step.name);
        push_str_field(&mut out, &step.description);
        let _ = write!(out, "{:+020}|", step.timestamp);
        push_str_field(&mut out, &step.intermediate_result);
        match step.modulus {
            Some(m) => {
                let _ = write!(out, "{:020}|", m);
            }
            None => out.push_str("-|"),
        }
        let _ = writeln!(out, "{:010}", step.entropy_sources.len());

        for source in &step.entropy_sources {
            out.push_str("source|");
            push_str_field(&mut out, &source.name);
            push_str_field(&mut out, &source.digest);
            let _ = write!(out, "{:+020}|", source.timestamp);
            push_str_field(&mut out, &source.description);
            match &source.raw_value {
                Some(raw) => {
                    let hex = digest::to_hex(raw);
                    let _ = write!(out, "{}:{}", hex.len(), hex);
                }
                None => out.push('-'),
            }
            out.push('\n');
        }
    }

    out.into_bytes()
}

/// Computes the verification hash of a ledger.
pub fn ledger_hash(ledger: &StepLedger) -> String {
    digest::sha256_hex([canonicalize(ledger)])
}

fn push_str_field(out: &mut String, value: &str) {
    let _ = write!(out, "{}:{}|", value.len(), value);
}
