//! Tally storage trait. Tallies are only ever written by `VoteStore`.

use ballast_types::{AggregateTally, ProposalId};

use crate::StoreError;

pub trait TallyStore {
    /// The proposal's tally, or `None` before its first vote.
    fn get_tally(&self, proposal: ProposalId) -> Result<Option<AggregateTally>, StoreError>;
}
