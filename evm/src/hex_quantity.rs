//! `0x`-prefixed hex encoding used by JSON-RPC for quantities and data.

use crate::EvmError;

/// Parse a JSON-RPC quantity such as `"0x1bc16d674ec80000"`.
pub fn parse_quantity(s: &str) -> Result<u128, EvmError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| EvmError::InvalidResponse(format!("quantity without 0x prefix: {s}")))?;
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        return Err(EvmError::Overflow);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| EvmError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

/// Decode `0x`-prefixed data bytes. `"0x"` decodes to an empty vector.
pub fn parse_data(s: &str) -> Result<Vec<u8>, EvmError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| EvmError::InvalidResponse(format!("data without 0x prefix: {s}")))?;
    hex::decode(digits).map_err(|e| EvmError::InvalidResponse(format!("bad data: {e}")))
}

pub fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x1bc16d674ec80000").unwrap(), 2_000_000_000_000_000_000);
        assert_eq!(
            parse_quantity("0x0000000000000000000000000000000000000000000000000000000000000010").unwrap(),
            16
        );
    }

    #[test]
    fn oversized_quantity_overflows() {
        assert_eq!(
            parse_quantity("0x100000000000000000000000000000000"),
            Err(EvmError::Overflow)
        );
    }

    #[test]
    fn missing_prefix_is_rejected() {
        assert!(matches!(parse_quantity("12"), Err(EvmError::InvalidResponse(_))));
        assert!(matches!(parse_data("abcd"), Err(EvmError::InvalidResponse(_))));
    }

    #[test]
    fn data_roundtrip() {
        assert_eq!(parse_data("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_data(&encode_data(&[0xde, 0xad])).unwrap(), vec![0xde, 0xad]);
    }
}
