//! Errors raised while parsing or combining core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("weight overflow")]
    WeightOverflow,

    #[error("tally for option {option} would go negative")]
    TallyUnderflow { option: String },
}
