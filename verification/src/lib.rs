//! Authorization Verifier.
//!
//! A vote is authorized when its signature over the canonical vote message
//! either recovers to the wallet address, or is accepted by the wallet's own
//! contract through `isValidSignature`.

pub mod error;
pub mod message;
pub mod verifier;

pub use error::AuthError;
pub use message::canonical_message;
pub use verifier::{AuthScheme, SignatureVerifier};
