//! Vote storage trait and the locked mutation protocol.

use std::time::Duration;

use ballast_types::{NewVote, ProposalId, Timestamp, Vote, VoteId, WalletAddress, Weight};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// A reweigh to apply to an existing vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReweighRequest {
    pub vote_id: VoteId,
    pub new_weight: Weight,
    /// The change is applied only when `|new - stored| > min_delta`.
    pub min_delta: Weight,
    pub now: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReweighOutcome {
    Applied { old: Weight, new: Weight },
    /// The stored weight was within `min_delta`; nothing was written.
    Skipped { stored: Weight },
}

/// Position in the staleness index: `(updated_at, vote id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StalenessCursor {
    pub updated_at: Timestamp,
    pub vote_id: VoteId,
}

impl StalenessCursor {
    pub const LEN: usize = 16;

    pub fn of(vote: &Vote) -> Self {
        Self {
            updated_at: vote.updated_at,
            vote_id: vote.id,
        }
    }

    /// Big-endian `updated_at ‖ vote_id`, ordered like the cursor itself.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..8].copy_from_slice(&self.updated_at.to_be_bytes());
        out[8..].copy_from_slice(&self.vote_id.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::LEN {
            return Err(StoreError::Corruption(format!(
                "staleness key has {} bytes",
                bytes.len()
            )));
        }
        let mut ts = [0u8; 8];
        let mut id = [0u8; 8];
        ts.copy_from_slice(&bytes[..8]);
        id.copy_from_slice(&bytes[8..]);
        Ok(Self {
            updated_at: Timestamp::from_be_bytes(ts),
            vote_id: VoteId::from_be_bytes(id),
        })
    }
}

pub trait VoteStore {
    fn get_vote(&self, id: VoteId) -> Result<Vote, StoreError>;

    /// The wallet's vote on `proposal`, if any. Lock-free read.
    fn find_vote(
        &self,
        proposal: ProposalId,
        wallet: &WalletAddress,
    ) -> Result<Option<Vote>, StoreError>;

    /// Atomically insert the vote and credit its weight to the tally.
    ///
    /// Inside one exclusive section: the uniqueness of `(proposal, wallet)`
    /// is re-checked (`Duplicate` on conflict), the vote row and its index
    /// entries are written, and the tally is created if absent and credited.
    /// Waiting longer than `lock_timeout` to enter the section fails with
    /// `LockTimeout` and writes nothing.
    fn record_vote(&self, vote: NewVote, lock_timeout: Duration) -> Result<Vote, StoreError>;

    /// Atomically replace a vote's weight and rebalance its option's total.
    ///
    /// The stored weight is read inside the exclusive section, so concurrent
    /// reweighs of the same vote never lose an update.
    fn apply_reweigh(
        &self,
        request: ReweighRequest,
        lock_timeout: Duration,
    ) -> Result<ReweighOutcome, StoreError>;

    /// Up to `limit` votes in staleness order (oldest `updated_at` first),
    /// strictly after `after` when given.
    fn stale_votes(
        &self,
        after: Option<StalenessCursor>,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError>;

    /// The proposal's votes newest first, skipping `offset`.
    fn recent_votes(
        &self,
        proposal: ProposalId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError>;

    /// Every vote on the proposal, oldest first.
    fn proposal_votes(&self, proposal: ProposalId) -> Result<Vec<Vote>, StoreError> {
        let mut votes = self.recent_votes(proposal, 0, usize::MAX)?;
        votes.reverse();
        Ok(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_bytes_sort_like_cursors() {
        let a = StalenessCursor {
            updated_at: Timestamp::from_millis(5),
            vote_id: VoteId::new(900),
        };
        let b = StalenessCursor {
            updated_at: Timestamp::from_millis(6),
            vote_id: VoteId::new(1),
        };
        assert!(a < b);
        assert!(a.to_bytes() < b.to_bytes());
        assert_eq!(StalenessCursor::from_bytes(&b.to_bytes()).unwrap(), b);
    }

    #[test]
    fn short_cursor_is_corruption() {
        assert!(matches!(
            StalenessCursor::from_bytes(&[0u8; 3]),
            Err(StoreError::Corruption(_))
        ));
    }
}
