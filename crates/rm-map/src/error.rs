//! Map-subsystem error type.
//!
//! Everything the reference map reader treated as fatal (a section whose byte
//! size does not match its row stride, an index past the end of a table, a
//! context of the wrong kind) is a typed error here so the host application
//! decides what to do with a corrupt map.

use thiserror::Error;

use rm_core::{CoreError, HashId, PointId};

/// Errors produced by `rm-map`.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("section {0:?} not found in map database")]
    MissingSection(String),

    #[error("invalid {section} structure: {size} bytes is not {count} rows of {stride} bytes")]
    InvalidStructure {
        section: String,
        size:    usize,
        count:   usize,
        stride:  usize,
    },

    #[error("section {section} has {got} rows, expected {expected}")]
    CountMismatch {
        section:  String,
        expected: usize,
        got:      usize,
    },

    #[error("invalid index {index} in {table} (size {count})")]
    IndexOutOfRange {
        table: &'static str,
        index: i64,
        count: usize,
    },

    #[error("invalid square grid: {0}")]
    InvalidGrid(String),

    #[error("point {0} does not belong to any square")]
    UnassignedPoint(PointId),

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] CoreError),

    #[error("no map with handle {0}")]
    UnknownMap(usize),

    #[error("no map is active")]
    NoActiveMap,

    #[error("row {index} added twice to hash table {table}")]
    DuplicateHashRow {
        table: String,
        index: u32,
    },

    #[error("no hash table {0}")]
    UnknownHash(HashId),

    #[error("map build error: {0}")]
    Build(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MapResult<T> = Result<T, MapError>;

impl MapError {
    /// Shorthand for the out-of-range case, which every table accessor shares.
    pub(crate) fn out_of_range(table: &'static str, index: impl Into<i64>, count: usize) -> Self {
        MapError::IndexOutOfRange { table, index: index.into(), count }
    }
}
