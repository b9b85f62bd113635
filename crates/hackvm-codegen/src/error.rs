//! Generation error types.

use hackvm_core::ArenaExhausted;
use thiserror::Error;

/// Errors surfaced while translating commands or writing output.
///
/// All of these are fatal to the generation session; there is no local
/// recovery. Output already flushed before the failure stays in the sink.
#[derive(Debug, Error)]
pub enum GenError {
    /// A translation did not fit in the generation arena.
    #[error(transparent)]
    Arena(#[from] ArenaExhausted),

    /// A command was handed to the wrong translation routine.
    #[error("`{keyword}` is not a {category} command")]
    InvalidOperation {
        keyword: &'static str,
        category: &'static str,
    },

    /// A memory segment is not valid for the operation.
    #[error("segment `{segment}` cannot be used with `{operation}`")]
    InvalidSegment {
        segment: &'static str,
        operation: &'static str,
    },

    /// The comparison-label counter would wrap; no further comparison
    /// operations can be generated in this session.
    #[error("comparison label counter exhausted")]
    CounterOverflow,

    /// Writing or flushing generated assembly to the sink failed.
    #[error("failed writing generated assembly")]
    Io(#[from] std::io::Error),
}
