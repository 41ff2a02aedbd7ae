//! LMDB implementation of ProposalStore.

use ballast_store::{ProposalStore, StoreError};
use ballast_types::{Proposal, ProposalId, Timestamp};

use crate::environment::NEXT_PROPOSAL_ID_KEY;
use crate::{LmdbEnvironment, LmdbError};

impl ProposalStore for LmdbEnvironment {
    fn create_proposal(
        &self,
        description: &str,
        options: &[String],
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        let _writer = self.writer_slot();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let id = ProposalId::new(self.next_id(&mut wtxn, NEXT_PROPOSAL_ID_KEY)?);
        let proposal = Proposal {
            id,
            description: description.to_string(),
            options: options.to_vec(),
            created_at: now,
        };
        let bytes = bincode::serialize(&proposal).map_err(LmdbError::from)?;
        self.proposals_db
            .put(&mut wtxn, &id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(proposal)
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Proposal, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals_db
            .get(&rtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("proposal {id}")))?;
        let proposal: Proposal = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(proposal)
    }

    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in self.proposals_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            let proposal: Proposal = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(proposal);
        }
        Ok(results)
    }
}
