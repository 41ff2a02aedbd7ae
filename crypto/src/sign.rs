//! secp256k1 personal-message signing and signer recovery.

use ballast_types::WalletAddress;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::address::address_of;
use crate::hash::personal_message_hash;
use crate::CryptoError;

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Recover the address that produced `signature` over `message` with
/// `personal_sign`.
///
/// Accepts `v` as 27/28 or 0/1. High-S signatures are normalised (with the
/// recovery parity flipped) rather than rejected, since some signers still
/// emit them.
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<WalletAddress, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::SignatureLength {
            expected: SIGNATURE_LEN,
            got: signature.len(),
        });
    }
    let v = signature[64];
    let parity = match v {
        27 | 28 => v - 27,
        0 | 1 => v,
        other => return Err(CryptoError::RecoveryId(other)),
    };
    let mut recid = RecoveryId::from_byte(parity).ok_or(CryptoError::RecoveryId(v))?;
    let mut sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recid)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_of(&key))
}

/// Produce a `personal_sign` signature (`v` in 27/28 form) with a raw
/// 32-byte private key. Wallet-side helper used by tooling and tests.
pub fn sign_personal_message(
    secret: &[u8; 32],
    message: &[u8],
) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
    let digest = personal_message_hash(message);
    let (sig, recid) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = 27 + recid.to_byte();
    Ok(out)
}

/// The address controlled by a raw 32-byte private key.
pub fn address_from_secret(secret: &[u8; 32]) -> Result<WalletAddress, CryptoError> {
    let key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
    Ok(address_of(key.verifying_key()))
}
