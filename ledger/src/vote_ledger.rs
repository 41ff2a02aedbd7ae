use std::collections::HashSet;
use std::sync::Arc;

use ballast_balances::{BalanceError, FailurePolicy, WeightAggregator, WeightReport};
use ballast_store::{LedgerStore, ReweighOutcome, ReweighRequest, StoreError};
use ballast_types::{NewVote, Proposal, VoteId, Vote, WalletAddress, Weight};
use ballast_utils::Clock;
use ballast_verification::{canonical_message, SignatureVerifier};
use tracing::{debug, error, info};

use crate::{LedgerConfig, VoteError, VoteSubmission};

/// The vote ledger service.
///
/// Holds no mutable state of its own; all coordination between concurrent
/// submissions and reweighs happens inside the store.
pub struct VoteLedger<S> {
    store: Arc<S>,
    weigher: Arc<WeightAggregator>,
    verifier: Arc<SignatureVerifier>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl<S> VoteLedger<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        weigher: Arc<WeightAggregator>,
        verifier: Arc<SignatureVerifier>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            weigher,
            verifier,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn weigher(&self) -> &WeightAggregator {
        &self.weigher
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run a store call on the blocking pool; it may wait for the tally lock.
    async fn with_store<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
    }

    /// Create a proposal. Administrative; not part of the vote path.
    pub async fn create_proposal(
        &self,
        description: &str,
        options: &[String],
    ) -> Result<Proposal, VoteError> {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(VoteError::InvalidRequest("description is empty".into()));
        }
        if options.is_empty() {
            return Err(VoteError::InvalidRequest("at least one option is required".into()));
        }
        let mut seen = HashSet::new();
        for option in options {
            if option.trim().is_empty() || option.trim() != option {
                return Err(VoteError::InvalidRequest(format!("bad option label '{option}'")));
            }
            if !seen.insert(option.as_str()) {
                return Err(VoteError::InvalidRequest(format!("duplicate option '{option}'")));
            }
        }

        let options = options.to_vec();
        let now = self.clock.now();
        let proposal = self
            .with_store(move |s| s.create_proposal(&description, &options, now))
            .await?;
        info!(proposal = %proposal.id, options = ?proposal.options, "proposal created");
        Ok(proposal)
    }

    /// Submit a vote.
    ///
    /// 1. Pre-check: proposal exists, option is allowed, wallet has not voted.
    /// 2. Verify the signature over the canonical message.
    /// 3. Weigh the wallet under the cast policy (strict by default).
    /// 4. Record vote and credit the tally in one exclusive store section,
    ///    which re-checks uniqueness.
    ///
    /// Any failure before step 4 leaves the store untouched.
    pub async fn submit_vote(&self, submission: VoteSubmission) -> Result<Vote, VoteError> {
        let result = self.submit_inner(submission.clone()).await;
        match &result {
            Ok(vote) => info!(
                proposal = %vote.proposal_id,
                wallet = %vote.wallet,
                vote_id = %vote.id,
                option = %vote.option,
                weight = %vote.weight,
                "vote recorded"
            ),
            Err(VoteError::Internal(msg)) => error!(
                proposal = %submission.proposal_id,
                wallet = %submission.wallet,
                error = %msg,
                "vote submission failed"
            ),
            Err(e) => info!(
                proposal = %submission.proposal_id,
                wallet = %submission.wallet,
                kind = e.kind().as_str(),
                "vote rejected"
            ),
        }
        result
    }

    async fn submit_inner(&self, submission: VoteSubmission) -> Result<Vote, VoteError> {
        if submission.signature.is_empty() {
            return Err(VoteError::InvalidRequest("signature is empty".into()));
        }
        let VoteSubmission {
            proposal_id,
            wallet,
            option,
            signature,
        } = submission;

        let (proposal, existing) = self
            .with_store(move |s| {
                let proposal = s.get_proposal(proposal_id)?;
                let existing = s.find_vote(proposal_id, &wallet)?;
                Ok((proposal, existing))
            })
            .await?;
        if !proposal.allows(&option) {
            return Err(VoteError::InvalidOption { option });
        }
        if existing.is_some() {
            return Err(already_voted(&proposal, &wallet));
        }

        let message = canonical_message(&proposal.description, &option);
        self.verifier
            .authorize(&message, &signature, &wallet)
            .await?;

        let report = self.weigh(&wallet, self.config.cast_policy).await?;

        let new_vote = NewVote {
            proposal_id,
            wallet,
            option,
            signature,
            weight: report.total,
            chain_id: self.config.cast_chain_id,
            cast_at: self.clock.now(),
        };
        let lock_timeout = self.config.lock_timeout;
        match self
            .with_store(move |s| s.record_vote(new_vote, lock_timeout))
            .await
        {
            Ok(vote) => Ok(vote),
            Err(StoreError::Duplicate(_)) => Err(already_voted(&proposal, &wallet)),
            Err(e) => Err(e.into()),
        }
    }

    /// Compute a wallet's current weight under `policy`.
    pub async fn weigh(
        &self,
        wallet: &WalletAddress,
        policy: FailurePolicy,
    ) -> Result<WeightReport, VoteError> {
        self.weigher
            .compute_weight(wallet, policy)
            .await
            .map_err(|e| match e {
                BalanceError::Overflow => VoteError::Internal(e.to_string()),
                other => VoteError::WeightUnavailable(other.to_string()),
            })
    }

    /// Replace a vote's weight with `new_weight` and rebalance the tally,
    /// unless the change is within `min_delta`.
    pub async fn reweigh_vote(
        &self,
        vote_id: VoteId,
        new_weight: Weight,
        min_delta: Weight,
    ) -> Result<ReweighOutcome, VoteError> {
        let request = ReweighRequest {
            vote_id,
            new_weight,
            min_delta,
            now: self.clock.now(),
        };
        let lock_timeout = self.config.lock_timeout;
        let outcome = self
            .with_store(move |s| s.apply_reweigh(request, lock_timeout))
            .await?;
        if let ReweighOutcome::Applied { old, new } = outcome {
            debug!(vote_id = %vote_id, old = %old, new = %new, "vote reweighed");
        }
        Ok(outcome)
    }
}

fn already_voted(proposal: &Proposal, wallet: &WalletAddress) -> VoteError {
    VoteError::AlreadyVoted {
        proposal: proposal.id.to_string(),
        wallet: wallet.to_string(),
    }
}
