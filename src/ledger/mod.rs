//! Step ledger, chain fold and canonical hashing.
//!
//! The ledger is the shared data model of generation and verification.
//! Both sides go through the same fold, reduction and canonical
//! encoding defined here, so re-deriving a number from its ledger is
//! bit-exact.

mod canonical;
mod chain;
mod step;

pub use canonical::{canonicalize, ledger_hash, LEDGER_FORMAT};
pub use chain::{
    fold_sources, fold_step, reduce, reduce_digest, replay, ChainReplay, LedgerBuilder, CHAIN_SEED,
    REDUCTION_PREFIX_BYTES,
};
pub use step::{GenerationStep, LedgerDefect, StepLedger};
