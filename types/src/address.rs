//! EVM wallet address type (`0x` + 20 bytes).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A 20-byte EVM account address.
///
/// Parsing is case-insensitive (checksummed and lowercase forms are both
/// accepted); the canonical rendering is lowercase with a `0x` prefix, so two
/// spellings of the same wallet always compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    pub const LEN: usize = 20;

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Left-pad to a 32-byte ABI word.
    pub fn to_abi_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidAddress(format!("{} bytes", bytes.len())))?;
        Ok(Self(arr))
    }
}

impl FromStr for WalletAddress {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| TypesError::InvalidAddress(s.to_string()))?;
        if body.len() != 40 {
            return Err(TypesError::InvalidAddress(s.to_string()));
        }
        let mut out = [0u8; 20];
        hex::decode_to_slice(body, &mut out)
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        Ok(Self(out))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = TypesError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(a: WalletAddress) -> Self {
        a.to_string()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksummed_and_lowercase_are_equal() {
        let a: WalletAddress = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap();
        let b: WalletAddress = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn rejects_bad_addresses() {
        for bad in ["", "0x", "7e5f4552091a69125d5dfcb7b8c2659029395bdf", "0x1234", "0xzz5f4552091a69125d5dfcb7b8c2659029395bdf"] {
            assert!(bad.parse::<WalletAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn abi_word_is_left_padded() {
        let a = WalletAddress::new([0xAB; 20]);
        let word = a.to_abi_word();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0xAB; 20]);
    }

    #[test]
    fn serde_uses_string_form() {
        let a = WalletAddress::new([1; 20]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0x0101010101010101010101010101010101010101\"");
        let back: WalletAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
