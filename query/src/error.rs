use ballast_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("price oracle unreachable: {0}")]
    Unreachable(String),

    #[error("price request failed: {0}")]
    RequestFailed(String),

    #[error("invalid price response: {0}")]
    InvalidResponse(String),
}
