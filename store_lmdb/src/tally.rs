//! LMDB implementation of TallyStore.

use ballast_store::{StoreError, TallyStore};
use ballast_types::{AggregateTally, ProposalId};

use crate::{LmdbEnvironment, LmdbError};

impl TallyStore for LmdbEnvironment {
    fn get_tally(&self, proposal: ProposalId) -> Result<Option<AggregateTally>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(val) = self
            .tallies_db
            .get(&rtxn, &proposal.to_be_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let tally: AggregateTally = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(Some(tally))
    }
}
