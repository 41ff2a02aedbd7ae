use ballast_evm::EvmError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("lookup on {contributor} failed: {reason}")]
    Lookup {
        contributor: String,
        reason: String,
        transient: bool,
    },

    #[error("lookup on {contributor} timed out")]
    Timeout { contributor: String },

    #[error("weight overflow while summing contributions")]
    Overflow,

    #[error("balance sources unavailable: {}", failed.join(", "))]
    SourceUnavailable { failed: Vec<String> },
}

impl BalanceError {
    pub fn from_evm(contributor: &str, err: EvmError) -> Self {
        match err {
            EvmError::Timeout => Self::Timeout {
                contributor: contributor.to_string(),
            },
            EvmError::Overflow => Self::Overflow,
            other => Self::Lookup {
                contributor: contributor.to_string(),
                transient: other.is_transient(),
                reason: other.to_string(),
            },
        }
    }

    /// Whether another attempt at the same lookup may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Lookup { transient, .. } => *transient,
            Self::Timeout { .. } => true,
            Self::Overflow | Self::SourceUnavailable { .. } => false,
        }
    }
}
