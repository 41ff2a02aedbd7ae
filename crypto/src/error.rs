use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature must be {expected} bytes, got {got}")]
    SignatureLength { expected: usize, got: usize },

    #[error("invalid recovery id {0}")]
    RecoveryId(u8),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signer recovery failed")]
    RecoveryFailed,

    #[error("invalid private key")]
    InvalidKey,
}
