//! Core error type.

use thiserror::Error;

/// Errors produced by `rm-core` parsing helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid position {0:?}: expected \"longitude,latitude\" in micro-degrees")]
    InvalidPosition(String),

    #[error("{what} value {value} is not a valid index")]
    InvalidIndex { what: &'static str, value: i64 },
}

pub type CoreResult<T> = Result<T, CoreError>;
