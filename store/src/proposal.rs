//! Proposal storage trait.

use ballast_types::{Proposal, ProposalId, Timestamp};

use crate::StoreError;

pub trait ProposalStore {
    /// Create a proposal, allocating the next id.
    fn create_proposal(
        &self,
        description: &str,
        options: &[String],
        now: Timestamp,
    ) -> Result<Proposal, StoreError>;

    fn get_proposal(&self, id: ProposalId) -> Result<Proposal, StoreError>;

    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError>;
}
