//! Nullable store: thread-safe in-memory ledger storage for testing.
//!
//! Each proposal has its own writer mutex, so mutations of one proposal
//! serialise while different proposals never contend. Waiting for that
//! mutex is bounded by the caller's lock timeout. Readers never take a
//! writer mutex: they see the last committed state, as LMDB readers do.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use ballast_store::{
    lock_within, MetaStore, ProposalStore, ReweighOutcome, ReweighRequest, StalenessCursor,
    StoreError, TallyLocks, TallyStore, VoteStore,
};
use ballast_types::{
    AggregateTally, NewVote, Proposal, ProposalId, Timestamp, Vote, VoteId, WalletAddress,
};

use crate::lock;

/// Committed state. Every write replaces it under one short critical section.
#[derive(Default)]
struct Committed {
    proposals: BTreeMap<ProposalId, Proposal>,
    votes: BTreeMap<VoteId, Vote>,
    wallet_votes: HashMap<(ProposalId, WalletAddress), VoteId>,
    /// Vote ids per proposal in insertion order.
    proposal_votes: HashMap<ProposalId, Vec<VoteId>>,
    tallies: HashMap<ProposalId, AggregateTally>,
    staleness: BTreeSet<StalenessCursor>,
    meta: HashMap<String, Vec<u8>>,
    next_proposal_id: u64,
    next_vote_id: u64,
}

/// An in-memory implementation of every ledger store trait.
pub struct NullStore {
    committed: Mutex<Committed>,
    writers: TallyLocks,
    injected_failure: Mutex<Option<StoreError>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            committed: Mutex::new(Committed {
                next_proposal_id: 1,
                next_vote_id: 1,
                ..Committed::default()
            }),
            writers: TallyLocks::new(),
            injected_failure: Mutex::new(None),
        }
    }

    /// Make the next `record_vote` or `apply_reweigh` fail with `error`
    /// before it writes anything.
    pub fn fail_next_write(&self, error: StoreError) {
        *lock(&self.injected_failure) = Some(error);
    }

    /// Hold the proposal's tally lock while `f` runs.
    pub fn with_tally_locked<R>(&self, proposal: ProposalId, f: impl FnOnce() -> R) -> R {
        let writer = self.writers.for_proposal(proposal);
        let _guard = lock(&writer);
        f()
    }

    pub fn vote_count(&self) -> usize {
        lock(&self.committed).votes.len()
    }

    fn take_injected_failure(&self) -> Result<(), StoreError> {
        match lock(&self.injected_failure).take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalStore for NullStore {
    fn create_proposal(
        &self,
        description: &str,
        options: &[String],
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        let mut state = lock(&self.committed);
        let id = ProposalId::new(state.next_proposal_id);
        state.next_proposal_id += 1;
        let proposal = Proposal {
            id,
            description: description.to_string(),
            options: options.to_vec(),
            created_at: now,
        };
        state.proposals.insert(id, proposal.clone());
        Ok(proposal)
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Proposal, StoreError> {
        lock(&self.committed)
            .proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("proposal {id}")))
    }

    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        Ok(lock(&self.committed).proposals.values().cloned().collect())
    }
}

impl VoteStore for NullStore {
    fn get_vote(&self, id: VoteId) -> Result<Vote, StoreError> {
        lock(&self.committed)
            .votes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vote {id}")))
    }

    fn find_vote(
        &self,
        proposal: ProposalId,
        wallet: &WalletAddress,
    ) -> Result<Option<Vote>, StoreError> {
        let state = lock(&self.committed);
        Ok(state
            .wallet_votes
            .get(&(proposal, *wallet))
            .and_then(|id| state.votes.get(id))
            .cloned())
    }

    fn record_vote(&self, vote: NewVote, lock_timeout: Duration) -> Result<Vote, StoreError> {
        let proposal = vote.proposal_id;
        let writer = self.writers.for_proposal(proposal);
        let _guard = lock_within(&writer, lock_timeout)?;
        self.take_injected_failure()?;

        let mut state = lock(&self.committed);
        if !state.proposals.contains_key(&proposal) {
            return Err(StoreError::NotFound(format!("proposal {proposal}")));
        }
        if state.wallet_votes.contains_key(&(proposal, vote.wallet)) {
            return Err(StoreError::Duplicate(format!(
                "wallet {} already voted on proposal {proposal}",
                vote.wallet
            )));
        }

        let id = VoteId::new(state.next_vote_id);
        let vote = vote.into_vote(id);
        let mut tally = state
            .tallies
            .get(&proposal)
            .cloned()
            .unwrap_or_else(|| AggregateTally::empty(proposal, vote.created_at));
        tally
            .credit(&vote.option, vote.weight, vote.created_at)
            .map_err(|e| StoreError::Corruption(e.to_string()))?;

        state.next_vote_id += 1;
        state.staleness.insert(StalenessCursor::of(&vote));
        state.wallet_votes.insert((proposal, vote.wallet), id);
        state.proposal_votes.entry(proposal).or_default().push(id);
        state.votes.insert(id, vote.clone());
        state.tallies.insert(proposal, tally);
        Ok(vote)
    }

    fn apply_reweigh(
        &self,
        request: ReweighRequest,
        lock_timeout: Duration,
    ) -> Result<ReweighOutcome, StoreError> {
        let proposal = self.get_vote(request.vote_id)?.proposal_id;
        let writer = self.writers.for_proposal(proposal);
        let _guard = lock_within(&writer, lock_timeout)?;
        self.take_injected_failure()?;

        let mut state = lock(&self.committed);
        let mut vote = state
            .votes
            .get(&request.vote_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", request.vote_id)))?;
        let stored = vote.weight;
        if stored.abs_diff(request.new_weight) <= request.min_delta {
            return Ok(ReweighOutcome::Skipped { stored });
        }

        let mut tally = state.tallies.get(&proposal).cloned().ok_or_else(|| {
            StoreError::Corruption(format!("vote {} has no tally", request.vote_id))
        })?;
        tally
            .rebalance(&vote.option, stored, request.new_weight, request.now)
            .map_err(|e| StoreError::Corruption(e.to_string()))?;

        state.staleness.remove(&StalenessCursor::of(&vote));
        vote.weight = request.new_weight;
        vote.updated_at = request.now;
        state.staleness.insert(StalenessCursor::of(&vote));
        state.votes.insert(vote.id, vote);
        state.tallies.insert(proposal, tally);

        Ok(ReweighOutcome::Applied {
            old: stored,
            new: request.new_weight,
        })
    }

    fn stale_votes(
        &self,
        after: Option<StalenessCursor>,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        let state = lock(&self.committed);
        let positions: Vec<StalenessCursor> = match after {
            Some(cursor) => state
                .staleness
                .range((std::ops::Bound::Excluded(cursor), std::ops::Bound::Unbounded))
                .take(limit)
                .copied()
                .collect(),
            None => state.staleness.iter().take(limit).copied().collect(),
        };
        positions
            .iter()
            .map(|p| {
                state
                    .votes
                    .get(&p.vote_id)
                    .cloned()
                    .ok_or_else(|| StoreError::Corruption(format!("stale index names vote {}", p.vote_id)))
            })
            .collect()
    }

    fn recent_votes(
        &self,
        proposal: ProposalId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        let state = lock(&self.committed);
        let Some(ids) = state.proposal_votes.get(&proposal) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| state.votes.get(id).cloned())
            .collect())
    }
}

impl TallyStore for NullStore {
    fn get_tally(&self, proposal: ProposalId) -> Result<Option<AggregateTally>, StoreError> {
        Ok(lock(&self.committed).tallies.get(&proposal).cloned())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        lock(&self.committed)
            .meta
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        lock(&self.committed)
            .meta
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("meta key '{key}'")))
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.committed).meta.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_types::{ChainId, Weight};
    use std::sync::Arc;
    use std::thread;

    fn new_vote(p: ProposalId, wallet: u8, option: &str, units: u64) -> NewVote {
        NewVote {
            proposal_id: p,
            wallet: WalletAddress::new([wallet; 20]),
            option: option.to_string(),
            signature: vec![1; 65],
            weight: Weight::from_units(units),
            chain_id: ChainId::ETHEREUM,
            cast_at: Timestamp::from_millis(u64::from(wallet)),
        }
    }

    #[test]
    fn records_and_rejects_duplicates() {
        let store = NullStore::new();
        let p = store
            .create_proposal("P", &["YES".into(), "NO".into()], Timestamp::EPOCH)
            .unwrap()
            .id;
        store.record_vote(new_vote(p, 1, "YES", 10), Duration::from_secs(1)).unwrap();
        let err = store
            .record_vote(new_vote(p, 1, "NO", 5), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(
            store.get_tally(p).unwrap().unwrap().total_for("YES"),
            Weight::from_units(10)
        );
    }

    #[test]
    fn held_lock_times_out() {
        let store = Arc::new(NullStore::new());
        let p = store
            .create_proposal("P", &["YES".into()], Timestamp::EPOCH)
            .unwrap()
            .id;
        let (tx, rx) = std::sync::mpsc::channel();
        let holder = {
            let store = store.clone();
            thread::spawn(move || {
                store.with_tally_locked(p, || {
                    tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(200));
                })
            })
        };
        rx.recv().unwrap();
        let err = store
            .record_vote(new_vote(p, 1, "YES", 1), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        assert!(store.get_tally(p).unwrap().is_none());
        assert!(store.find_vote(p, &WalletAddress::new([1; 20])).unwrap().is_none());
        holder.join().unwrap();
        assert_eq!(store.vote_count(), 0);
    }

    #[test]
    fn injected_failure_writes_nothing() {
        let store = NullStore::new();
        let p = store
            .create_proposal("P", &["YES".into()], Timestamp::EPOCH)
            .unwrap()
            .id;
        store.fail_next_write(StoreError::Backend("disk full".into()));
        assert!(store.record_vote(new_vote(p, 1, "YES", 1), Duration::from_secs(1)).is_err());
        assert!(store.get_tally(p).unwrap().is_none());
        assert!(store.record_vote(new_vote(p, 1, "YES", 1), Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn schema_version_defaults_to_zero() {
        let store = NullStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}
