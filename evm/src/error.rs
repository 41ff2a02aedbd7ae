use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    #[error("rpc endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("rpc request timed out")]
    Timeout,

    #[error("rpc request failed: {0}")]
    RequestFailed(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("value does not fit in 128 bits")]
    Overflow,
}

impl EvmError {
    /// Errors worth another attempt against the same endpoint.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Timeout | Self::RequestFailed(_)
        )
    }
}
