//! Vote records.

use serde::{Deserialize, Serialize};

use crate::{ChainId, ProposalId, Timestamp, VoteId, WalletAddress, Weight};

/// A persisted vote. At most one exists per (proposal, wallet).
///
/// Only `weight` and `updated_at` ever change after creation, and only
/// through a reweigh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub proposal_id: ProposalId,
    pub wallet: WalletAddress,
    pub option: String,
    /// Raw authorization signature as submitted.
    pub signature: Vec<u8>,
    pub weight: Weight,
    /// Chain context recorded at cast time.
    pub chain_id: ChainId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A vote about to be inserted; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVote {
    pub proposal_id: ProposalId,
    pub wallet: WalletAddress,
    pub option: String,
    pub signature: Vec<u8>,
    pub weight: Weight,
    pub chain_id: ChainId,
    pub cast_at: Timestamp,
}

impl NewVote {
    pub fn into_vote(self, id: VoteId) -> Vote {
        Vote {
            id,
            proposal_id: self.proposal_id,
            wallet: self.wallet,
            option: self.option,
            signature: self.signature,
            weight: self.weight,
            chain_id: self.chain_id,
            created_at: self.cast_at,
            updated_at: self.cast_at,
        }
    }
}
