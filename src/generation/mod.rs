//! Number generation.
//!
//! Folds collected entropy through a fixed sequence of named stages,
//! recording one ledger step per stage, and reduces the final digest
//! into the requested range.

mod generator;

pub use generator::{
    GenerationError, GenerationResult, Generator, STAGE_FOLD, STAGE_PRIMARY, STAGE_REDUCE,
    STAGE_TIMING,
};
