//! Error types.
//!
//! Reducers never surface errors: a value that cannot be used is skipped.
//! These types cover everything around the reduction contract, such as field
//! access on an `Entry`, parsing reducer descriptions and loading
//! configuration.

use thiserror::Error;

/// Failure to read a field from an `Entry`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("field '{0}' not found in entry")]
    MissingField(String),

    #[error("value {0:?} is not a valid number")]
    InvalidFloat(String),

    #[error("value {0:?} is out of range for a 64-bit float")]
    OutOfRange(String),
}

/// Errors raised while describing, configuring or driving a reduction.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("channel capacity must be greater than zero")]
    InvalidCapacity,

    #[error("{0} does not aggregate and cannot be chained")]
    NonAggregating(String),

    #[error("{0} finished without emitting a result")]
    ResultDropped(String),
}
