//! Address derivation from secp256k1 public keys.

use ballast_types::WalletAddress;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::hash::keccak256;

/// The wallet address controlled by `key`: the last 20 bytes of the
/// keccak-256 hash of the uncompressed point (without the `0x04` tag).
pub fn address_of(key: &VerifyingKey) -> WalletAddress {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    WalletAddress::new(out)
}
