//! Cryptographic primitives for ballast.
//!
//! - **Keccak-256** for message digests and address derivation
//! - **EIP-191** personal-message hashing (what wallets sign for `personal_sign`)
//! - **secp256k1** signer recovery from 65-byte `r ‖ s ‖ v` signatures
//! - Address derivation from a public key (last 20 bytes of its keccak hash)

pub mod address;
pub mod error;
pub mod hash;
pub mod sign;

pub use address::address_of;
pub use error::CryptoError;
pub use hash::{keccak256, keccak256_multi, personal_message_hash};
pub use sign::{address_from_secret, recover_signer, sign_personal_message, SIGNATURE_LEN};
