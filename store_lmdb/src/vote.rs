//! LMDB implementation of VoteStore, including the locked insert and
//! reweigh transactions.

use std::ops::Bound;
use std::time::Duration;

use ballast_store::{ReweighOutcome, ReweighRequest, StalenessCursor, StoreError, VoteStore};
use ballast_types::{
    AggregateTally, NewVote, ProposalId, TypesError, Vote, VoteId, WalletAddress,
};
use heed::RoTxn;

use crate::environment::NEXT_VOTE_ID_KEY;
use crate::keys::{decode_u64, increment_prefix, proposal_vote_key, wallet_vote_key};
use crate::{LmdbEnvironment, LmdbError};

fn tally_error(proposal: ProposalId, e: TypesError) -> StoreError {
    StoreError::Corruption(format!("tally for proposal {proposal}: {e}"))
}

impl LmdbEnvironment {
    fn load_vote(&self, txn: &RoTxn<'_>, id: VoteId) -> Result<Option<Vote>, StoreError> {
        let Some(val) = self
            .votes_db
            .get(txn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let vote: Vote = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(Some(vote))
    }

    fn indexed_vote(&self, txn: &RoTxn<'_>, id: VoteId) -> Result<Vote, StoreError> {
        self.load_vote(txn, id)?
            .ok_or_else(|| StoreError::Corruption(format!("index points at missing vote {id}")))
    }

    fn load_tally(
        &self,
        txn: &RoTxn<'_>,
        proposal: ProposalId,
    ) -> Result<Option<AggregateTally>, StoreError> {
        let Some(val) = self
            .tallies_db
            .get(txn, &proposal.to_be_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let tally: AggregateTally = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(Some(tally))
    }
}

impl VoteStore for LmdbEnvironment {
    fn get_vote(&self, id: VoteId) -> Result<Vote, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.load_vote(&rtxn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("vote {id}")))
    }

    fn find_vote(
        &self,
        proposal: ProposalId,
        wallet: &WalletAddress,
    ) -> Result<Option<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = wallet_vote_key(proposal, wallet);
        let Some(raw_id) = self
            .wallet_votes_db
            .get(&rtxn, &key)
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let id = decode_u64(raw_id)
            .map(VoteId::new)
            .ok_or_else(|| StoreError::Corruption("malformed wallet index entry".to_string()))?;
        self.indexed_vote(&rtxn, id).map(Some)
    }

    fn record_vote(&self, vote: NewVote, lock_timeout: Duration) -> Result<Vote, StoreError> {
        let proposal = vote.proposal_id;
        let unique_key = wallet_vote_key(proposal, &vote.wallet);

        self.tally_write(proposal, lock_timeout, |wtxn| {
            if self
                .proposals_db
                .get(wtxn, &proposal.to_be_bytes())
                .map_err(LmdbError::from)?
                .is_none()
            {
                return Err(StoreError::NotFound(format!("proposal {proposal}")));
            }
            if self
                .wallet_votes_db
                .get(wtxn, &unique_key)
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::Duplicate(format!(
                    "wallet {} already voted on proposal {proposal}",
                    vote.wallet
                )));
            }

            let id = VoteId::new(self.next_id(wtxn, NEXT_VOTE_ID_KEY)?);
            let vote = vote.into_vote(id);

            let mut tally = self
                .load_tally(wtxn, proposal)?
                .unwrap_or_else(|| AggregateTally::empty(proposal, vote.created_at));
            tally
                .credit(&vote.option, vote.weight, vote.created_at)
                .map_err(|e| tally_error(proposal, e))?;

            let vote_bytes = bincode::serialize(&vote).map_err(LmdbError::from)?;
            let tally_bytes = bincode::serialize(&tally).map_err(LmdbError::from)?;
            self.votes_db
                .put(wtxn, &id.to_be_bytes(), &vote_bytes)
                .map_err(LmdbError::from)?;
            self.wallet_votes_db
                .put(wtxn, &unique_key, &id.to_be_bytes())
                .map_err(LmdbError::from)?;
            self.proposal_votes_db
                .put(wtxn, &proposal_vote_key(proposal, id.get()), &[])
                .map_err(LmdbError::from)?;
            self.staleness_db
                .put(wtxn, &StalenessCursor::of(&vote).to_bytes(), &[])
                .map_err(LmdbError::from)?;
            self.tallies_db
                .put(wtxn, &proposal.to_be_bytes(), &tally_bytes)
                .map_err(LmdbError::from)?;
            Ok(vote)
        })
    }

    fn apply_reweigh(
        &self,
        request: ReweighRequest,
        lock_timeout: Duration,
    ) -> Result<ReweighOutcome, StoreError> {
        let proposal = self.get_vote(request.vote_id)?.proposal_id;

        self.tally_write(proposal, lock_timeout, |wtxn| {
            let mut vote = self
                .load_vote(wtxn, request.vote_id)?
                .ok_or_else(|| StoreError::NotFound(format!("vote {}", request.vote_id)))?;
            let stored = vote.weight;
            if stored.abs_diff(request.new_weight) <= request.min_delta {
                return Ok(ReweighOutcome::Skipped { stored });
            }

            let mut tally = self.load_tally(wtxn, proposal)?.ok_or_else(|| {
                StoreError::Corruption(format!("vote {} has no tally", request.vote_id))
            })?;
            tally
                .rebalance(&vote.option, stored, request.new_weight, request.now)
                .map_err(|e| tally_error(proposal, e))?;

            let old_position = StalenessCursor::of(&vote);
            vote.weight = request.new_weight;
            vote.updated_at = request.now;

            let vote_bytes = bincode::serialize(&vote).map_err(LmdbError::from)?;
            let tally_bytes = bincode::serialize(&tally).map_err(LmdbError::from)?;
            self.staleness_db
                .delete(wtxn, &old_position.to_bytes())
                .map_err(LmdbError::from)?;
            self.staleness_db
                .put(wtxn, &StalenessCursor::of(&vote).to_bytes(), &[])
                .map_err(LmdbError::from)?;
            self.votes_db
                .put(wtxn, &vote.id.to_be_bytes(), &vote_bytes)
                .map_err(LmdbError::from)?;
            self.tallies_db
                .put(wtxn, &proposal.to_be_bytes(), &tally_bytes)
                .map_err(LmdbError::from)?;

            Ok(ReweighOutcome::Applied {
                old: stored,
                new: request.new_weight,
            })
        })
    }

    fn stale_votes(
        &self,
        after: Option<StalenessCursor>,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let start = after.map(|c| c.to_bytes());
        let lower = match &start {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Unbounded,
        };
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (lower, Bound::Unbounded);

        let mut results = Vec::new();
        for entry in self
            .staleness_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?
            .take(limit)
        {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let position = StalenessCursor::from_bytes(key)?;
            results.push(self.indexed_vote(&rtxn, position.vote_id)?);
        }
        Ok(results)
    }

    fn recent_votes(
        &self,
        proposal: ProposalId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = proposal.to_be_bytes();
        let mut upper = prefix.to_vec();
        increment_prefix(&mut upper);
        let upper_bound = if upper.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(upper.as_slice())
        };
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) =
            (Bound::Included(prefix.as_slice()), upper_bound);

        let mut results = Vec::new();
        for entry in self
            .proposal_votes_db
            .rev_range(&rtxn, &bounds)
            .map_err(LmdbError::from)?
            .skip(offset)
            .take(limit)
        {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let id = decode_u64(key.get(8..).unwrap_or_default())
                .map(VoteId::new)
                .ok_or_else(|| StoreError::Corruption("malformed proposal index key".to_string()))?;
            results.push(self.indexed_vote(&rtxn, id)?);
        }
        Ok(results)
    }
}
