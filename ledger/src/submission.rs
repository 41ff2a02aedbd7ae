use ballast_types::{ProposalId, WalletAddress};
use serde::{Deserialize, Serialize};

/// An inbound vote: `{proposalId, walletAddress, chosenOption, signature}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSubmission {
    pub proposal_id: ProposalId,
    pub wallet: WalletAddress,
    pub option: String,
    /// Raw signature bytes over the canonical vote message.
    pub signature: Vec<u8>,
}
