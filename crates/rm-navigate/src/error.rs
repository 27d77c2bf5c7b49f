//! Route-search error type.

use thiserror::Error;

use rm_core::{IterationId, Position};
use rm_map::MapError;

/// Errors produced by `rm-navigate`.
#[derive(Debug, Error)]
pub enum NavigateError {
    /// The search ran out of iterations or never finished.
    #[error("no route found after {iterations} iterations")]
    NoRoute { iterations: u32 },

    #[error("no route algorithm named {0:?}")]
    UnknownAlgorithm(String),

    #[error("route algorithm {0:?} is already registered")]
    DuplicateAlgorithm(String),

    #[error("no line within reach of {0}")]
    NoCandidateLine(Position),

    #[error("iteration {0} is not part of this search")]
    InvalidIteration(IterationId),

    #[error(transparent)]
    Map(#[from] MapError),
}

pub type NavigateResult<T> = Result<T, NavigateError>;
