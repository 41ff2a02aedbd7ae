//! Cursor-based pagination for the recent-vote feed.

use serde::Deserialize;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Opaque cursor from a previous response.
    pub cursor: Option<String>,
    /// Items per page; the query service applies the default and the cap.
    pub limit: Option<usize>,
}

impl PaginationParams {
    /// Decode the cursor to a numeric offset. Absent or unreadable cursors
    /// start from the first page.
    pub fn decode_offset(&self) -> usize {
        self.cursor
            .as_deref()
            .and_then(decode_cursor)
            .and_then(|o| usize::try_from(o).ok())
            .unwrap_or(0)
    }
}

/// Encode an offset as an opaque cursor (hex of the big-endian offset).
pub fn encode_cursor(offset: u64) -> String {
    hex::encode(offset.to_be_bytes())
}

pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes = hex::decode(cursor).ok()?;
    let raw: [u8; 8] = bytes.as_slice().try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        assert_eq!(decode_cursor(&encode_cursor(10)), Some(10));
        assert_eq!(encode_cursor(10), "000000000000000a");
    }

    #[test]
    fn garbage_cursor_starts_at_zero() {
        let params = PaginationParams {
            cursor: Some("not-a-cursor".into()),
            limit: None,
        };
        assert_eq!(params.decode_offset(), 0);
        assert_eq!(decode_cursor("0a"), None);
    }
}
