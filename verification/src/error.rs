use ballast_evm::EvmError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("empty signature")]
    EmptySignature,

    #[error("signature rejected (direct: {direct}; contract: {contract})")]
    Unauthorized { direct: String, contract: String },

    /// The direct path failed and the contract wallet could not be asked.
    /// The signature may still be valid.
    #[error("contract wallet check unavailable: {0}")]
    Unavailable(EvmError),
}

impl AuthError {
    /// `true` when the same submission may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
