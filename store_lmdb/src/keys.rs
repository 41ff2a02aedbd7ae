//! Binary key layouts. All integers are big-endian so LMDB's lexicographic
//! key order equals numeric order.

use ballast_types::{ProposalId, WalletAddress};

/// `proposal_be(8) ++ wallet(20)`, the one-vote-per-wallet index.
pub fn wallet_vote_key(proposal: ProposalId, wallet: &WalletAddress) -> [u8; 28] {
    let mut key = [0u8; 28];
    key[..8].copy_from_slice(&proposal.to_be_bytes());
    key[8..].copy_from_slice(wallet.as_bytes());
    key
}

/// `proposal_be(8) ++ vote_id_be(8)`; vote ids grow with time, so this
/// orders a proposal's votes chronologically.
pub fn proposal_vote_key(proposal: ProposalId, vote_id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&proposal.to_be_bytes());
    key[8..].copy_from_slice(&vote_id.to_be_bytes());
    key
}

/// Increment a byte prefix in place to get the exclusive upper bound of a
/// prefix scan. An all-`0xff` prefix becomes empty (unbounded).
pub fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return;
        }
        prefix.pop();
    }
}

pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_prefix_carries() {
        let mut p = vec![0x00, 0x01];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x00, 0x02]);

        let mut p = vec![0x01, 0xff];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x02]);

        let mut p = vec![0xff, 0xff];
        increment_prefix(&mut p);
        assert!(p.is_empty());
    }

    #[test]
    fn proposal_vote_keys_sort_by_proposal_then_vote() {
        let a = proposal_vote_key(ProposalId::new(1), 300);
        let b = proposal_vote_key(ProposalId::new(2), 1);
        let c = proposal_vote_key(ProposalId::new(2), 2);
        assert!(a < b && b < c);
    }

    #[test]
    fn wallet_vote_key_layout() {
        let key = wallet_vote_key(ProposalId::new(7), &WalletAddress::new([0xab; 20]));
        assert_eq!(&key[..8], &7u64.to_be_bytes());
        assert!(key[8..].iter().all(|b| *b == 0xab));
        assert_eq!(decode_u64(&key[..8]), Some(7));
        assert_eq!(decode_u64(&key[..3]), None);
    }
}
