use std::sync::{Arc, Mutex};

use ballast_store::LedgerStore;
use ballast_types::{
    AggregateTally, Proposal, ProposalId, Vote, VoterCounts, WalletAddress, Weight,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{PriceOracle, QueryError};

/// Recent-vote page size when the caller does not ask for one.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

pub const MAX_RECENT_LIMIT: usize = 100;

/// Where a display price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Live,
    LastKnown,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub price: f64,
    pub source: PriceSource,
}

/// A proposal's tally with its display-currency value.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyView {
    pub proposal: Proposal,
    /// Zero totals for every option when nobody has voted yet.
    pub tally: AggregateTally,
    pub total_weight: Weight,
    /// `total_weight` in the display currency. Informational only.
    pub display_value: f64,
    pub price: PriceQuote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalletVote {
    pub proposal_id: ProposalId,
    pub wallet: WalletAddress,
    pub vote: Option<Vote>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentVotes {
    pub proposal_id: ProposalId,
    /// Newest first.
    pub votes: Vec<Vote>,
    pub counts: VoterCounts,
    /// Offset of the next page, if there may be one.
    pub next_offset: Option<usize>,
}

pub struct QueryService<S> {
    store: Arc<S>,
    oracle: Arc<dyn PriceOracle>,
    fallback_price: f64,
    last_price: Mutex<Option<f64>>,
}

impl<S: LedgerStore> QueryService<S> {
    pub fn new(store: Arc<S>, oracle: Arc<dyn PriceOracle>, fallback_price: f64) -> Self {
        Self {
            store,
            oracle,
            fallback_price,
            last_price: Mutex::new(None),
        }
    }

    /// Current display price. Never fails: an oracle error falls back to the
    /// last price seen, then to the configured fallback.
    pub async fn price(&self) -> PriceQuote {
        match self.oracle.price().await {
            Ok(price) => {
                *self.last_price.lock().unwrap_or_else(|e| e.into_inner()) = Some(price);
                PriceQuote {
                    price,
                    source: PriceSource::Live,
                }
            }
            Err(e) => {
                let last = *self.last_price.lock().unwrap_or_else(|e| e.into_inner());
                let quote = match last {
                    Some(price) => PriceQuote {
                        price,
                        source: PriceSource::LastKnown,
                    },
                    None => PriceQuote {
                        price: self.fallback_price,
                        source: PriceSource::Fallback,
                    },
                };
                warn!(
                    error = %e,
                    price = quote.price,
                    source = ?quote.source,
                    "price oracle failed"
                );
                quote
            }
        }
    }

    pub async fn tally(&self, proposal_id: ProposalId) -> Result<TallyView, QueryError> {
        let proposal = self.store.get_proposal(proposal_id)?;
        let tally = match self.store.get_tally(proposal_id)? {
            Some(tally) => tally,
            None => empty_tally(&proposal),
        };
        let total_weight = tally.grand_total();
        let price = self.price().await;
        Ok(TallyView {
            display_value: total_weight.as_f64_units() * price.price,
            proposal,
            tally,
            total_weight,
            price,
        })
    }

    pub fn wallet_vote(
        &self,
        proposal_id: ProposalId,
        wallet: &WalletAddress,
    ) -> Result<WalletVote, QueryError> {
        self.store.get_proposal(proposal_id)?;
        Ok(WalletVote {
            proposal_id,
            wallet: *wallet,
            vote: self.store.find_vote(proposal_id, wallet)?,
        })
    }

    /// Newest votes first. `limit` defaults to [`DEFAULT_RECENT_LIMIT`] and
    /// is clamped to `1..=MAX_RECENT_LIMIT`.
    pub fn recent_votes(
        &self,
        proposal_id: ProposalId,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<RecentVotes, QueryError> {
        self.store.get_proposal(proposal_id)?;
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        let votes = self.store.recent_votes(proposal_id, offset, limit)?;
        let counts = self
            .store
            .get_tally(proposal_id)?
            .map(|t| t.voter_counts())
            .unwrap_or_default();
        let next_offset = (votes.len() == limit).then(|| offset + votes.len());
        Ok(RecentVotes {
            proposal_id,
            votes,
            counts,
            next_offset,
        })
    }
}

fn empty_tally(proposal: &Proposal) -> AggregateTally {
    let mut tally = AggregateTally::empty(proposal.id, proposal.created_at);
    for option in &proposal.options {
        tally.totals.insert(option.clone(), Weight::ZERO);
        tally.voters.insert(option.clone(), 0);
    }
    tally
}
