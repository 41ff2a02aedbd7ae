//! Hand-rolled ABI encoding for the two contract calls the ledger makes.

use ballast_types::WalletAddress;

use crate::EvmError;

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// `isValidSignature(bytes32,bytes)`; also the value a contract wallet
/// returns when it accepts the signature.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

const WORD: usize = 32;

pub fn encode_balance_of(owner: &WalletAddress) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&owner.to_abi_word());
    data
}

/// `selector ‖ digest ‖ offset(0x40) ‖ len ‖ signature padded to a word boundary`
pub fn encode_is_valid_signature(digest: &[u8; 32], signature: &[u8]) -> Vec<u8> {
    let padded = signature.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(4 + 3 * WORD + padded);
    data.extend_from_slice(&ERC1271_MAGIC_VALUE);
    data.extend_from_slice(digest);
    data.extend_from_slice(&uint_word(2 * WORD as u64));
    data.extend_from_slice(&uint_word(signature.len() as u64));
    data.extend_from_slice(signature);
    data.resize(4 + 3 * WORD + padded, 0);
    data
}

/// Decode the first return word as an unsigned integer.
pub fn decode_uint128(output: &[u8]) -> Result<u128, EvmError> {
    if output.len() < WORD {
        return Err(EvmError::InvalidResponse(format!(
            "expected a 32-byte word, got {} bytes",
            output.len()
        )));
    }
    if output[..16].iter().any(|b| *b != 0) {
        return Err(EvmError::Overflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&output[16..WORD]);
    Ok(u128::from_be_bytes(low))
}

/// Whether an `isValidSignature` return value carries the magic constant.
pub fn is_magic_value(output: &[u8]) -> bool {
    output.len() >= 4 && output[..4] == ERC1271_MAGIC_VALUE
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_of_layout() {
        let owner: WalletAddress = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let data = encode_balance_of(&owner);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &BALANCE_OF_SELECTOR);
        assert_eq!(data[35], 0xff);
        assert!(data[4..35].iter().all(|b| *b == 0));
    }

    #[test]
    fn is_valid_signature_layout() {
        let digest = [0xaa; 32];
        let sig = [0x11; 65];
        let data = encode_is_valid_signature(&digest, &sig);
        assert_eq!(data.len(), 4 + 32 * 3 + 96);
        assert_eq!(&data[..4], &ERC1271_MAGIC_VALUE);
        assert_eq!(&data[4..36], &digest);
        assert_eq!(data[67], 0x40);
        assert_eq!(data[99], 65);
        assert_eq!(&data[100..165], &sig[..]);
        assert!(data[165..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decodes_uint_words() {
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(decode_uint128(&word).unwrap(), 7);
        word[0] = 1;
        assert_eq!(decode_uint128(&word), Err(EvmError::Overflow));
        assert!(decode_uint128(&[0u8; 4]).is_err());
    }

    #[test]
    fn magic_value_detection() {
        let mut word = [0u8; 32];
        word[..4].copy_from_slice(&ERC1271_MAGIC_VALUE);
        assert!(is_magic_value(&word));
        assert!(!is_magic_value(&[]));
        assert!(!is_magic_value(&[0u8; 32]));
    }
}
