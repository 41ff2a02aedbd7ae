use std::time::Duration;

use ballast_store::StoreError;
use ballast_verification::AuthError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("wallet {wallet} has already voted on proposal {proposal}")]
    AlreadyVoted { proposal: String, wallet: String },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("voting weight unavailable: {0}")]
    WeightUnavailable(String),

    #[error("tally is busy (waited {waited:?}), retry later")]
    LockTimeout { waited: Duration },

    #[error("option '{option}' is not allowed on this proposal")]
    InvalidOption { option: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteErrorKind {
    NotFound,
    AlreadyVoted,
    InvalidSignature,
    WeightUnavailable,
    LockTimeout,
    InvalidOption,
    InvalidRequest,
    Internal,
}

impl VoteErrorKind {
    pub const ALL: [VoteErrorKind; 8] = [
        Self::NotFound,
        Self::AlreadyVoted,
        Self::InvalidSignature,
        Self::WeightUnavailable,
        Self::LockTimeout,
        Self::InvalidOption,
        Self::InvalidRequest,
        Self::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyVoted => "already_voted",
            Self::InvalidSignature => "invalid_signature",
            Self::WeightUnavailable => "weight_unavailable",
            Self::LockTimeout => "lock_timeout",
            Self::InvalidOption => "invalid_option",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        }
    }
}

impl VoteError {
    pub fn kind(&self) -> VoteErrorKind {
        match self {
            Self::NotFound(_) => VoteErrorKind::NotFound,
            Self::AlreadyVoted { .. } => VoteErrorKind::AlreadyVoted,
            Self::InvalidSignature(_) => VoteErrorKind::InvalidSignature,
            Self::WeightUnavailable(_) => VoteErrorKind::WeightUnavailable,
            Self::LockTimeout { .. } => VoteErrorKind::LockTimeout,
            Self::InvalidOption { .. } => VoteErrorKind::InvalidOption,
            Self::InvalidRequest(_) => VoteErrorKind::InvalidRequest,
            Self::Internal(_) => VoteErrorKind::Internal,
        }
    }

    /// Whether the same request may succeed if sent again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            VoteErrorKind::LockTimeout | VoteErrorKind::WeightUnavailable
        )
    }
}

impl From<StoreError> for VoteError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => VoteError::NotFound(what),
            StoreError::LockTimeout { waited } => VoteError::LockTimeout { waited },
            other => VoteError::Internal(other.to_string()),
        }
    }
}

/// A contract wallet that could not be asked shares the weight path's
/// retryable status: both mean the chain did not answer.
impl From<AuthError> for VoteError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unavailable(cause) => {
                VoteError::WeightUnavailable(format!("signature check: {cause}"))
            }
            other => VoteError::InvalidSignature(other.to_string()),
        }
    }
}
