//! Per-proposal aggregate tally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ProposalId, Timestamp, TypesError, Weight};

/// Cumulative weight (and voter count) per option for one proposal.
///
/// At every quiescent point `totals[o]` equals the sum of the weights of the
/// proposal's votes for `o`, and `voters[o]` equals their number. The store
/// keys tallies by proposal, so the proposal id doubles as the tally id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTally {
    pub proposal_id: ProposalId,
    pub totals: BTreeMap<String, Weight>,
    pub voters: BTreeMap<String, u64>,
    pub last_updated_at: Timestamp,
}

/// Voter counts for the recent-vote feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCounts {
    pub total: u64,
    pub per_option: BTreeMap<String, u64>,
}

impl AggregateTally {
    pub fn empty(proposal_id: ProposalId, now: Timestamp) -> Self {
        Self {
            proposal_id,
            totals: BTreeMap::new(),
            voters: BTreeMap::new(),
            last_updated_at: now,
        }
    }

    pub fn total_for(&self, option: &str) -> Weight {
        self.totals.get(option).copied().unwrap_or(Weight::ZERO)
    }

    /// Sum over all options, saturating at the largest representable weight.
    pub fn grand_total(&self) -> Weight {
        self.totals.values().copied().sum()
    }

    /// Add a freshly cast vote.
    pub fn credit(
        &mut self,
        option: &str,
        weight: Weight,
        now: Timestamp,
    ) -> Result<(), TypesError> {
        let new_total = self
            .total_for(option)
            .checked_add(weight)
            .ok_or(TypesError::WeightOverflow)?;
        self.totals.insert(option.to_string(), new_total);
        *self.voters.entry(option.to_string()).or_insert(0) += 1;
        self.last_updated_at = now;
        Ok(())
    }

    /// Replace a vote's previous weight with its new weight.
    pub fn rebalance(
        &mut self,
        option: &str,
        old: Weight,
        new: Weight,
        now: Timestamp,
    ) -> Result<(), TypesError> {
        let without_old = self
            .total_for(option)
            .checked_sub(old)
            .ok_or_else(|| TypesError::TallyUnderflow {
                option: option.to_string(),
            })?;
        let updated = without_old
            .checked_add(new)
            .ok_or(TypesError::WeightOverflow)?;
        self.totals.insert(option.to_string(), updated);
        self.last_updated_at = now;
        Ok(())
    }

    pub fn voter_counts(&self) -> VoterCounts {
        VoterCounts {
            total: self.voters.values().sum(),
            per_option: self.voters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Weight {
        Weight::parse_decimal(s).unwrap()
    }

    #[test]
    fn credit_accumulates_per_option() {
        let mut t = AggregateTally::empty(ProposalId::new(1), Timestamp::EPOCH);
        t.credit("YES", w("10"), Timestamp::from_millis(1)).unwrap();
        t.credit("NO", w("5"), Timestamp::from_millis(2)).unwrap();
        t.credit("YES", w("0.5"), Timestamp::from_millis(3)).unwrap();
        assert_eq!(t.total_for("YES"), w("10.5"));
        assert_eq!(t.total_for("NO"), w("5"));
        assert_eq!(t.grand_total(), w("15.5"));
        assert_eq!(t.voter_counts().total, 3);
        assert_eq!(t.voter_counts().per_option["YES"], 2);
        assert_eq!(t.last_updated_at, Timestamp::from_millis(3));
    }

    #[test]
    fn grand_total_saturates_across_options() {
        let half = Weight::from_wei(u128::MAX / 2 + 1);
        let mut t = AggregateTally::empty(ProposalId::new(1), Timestamp::EPOCH);
        t.credit("YES", half, Timestamp::from_millis(1)).unwrap();
        t.credit("NO", half, Timestamp::from_millis(2)).unwrap();
        assert_eq!(t.grand_total(), Weight::from_wei(u128::MAX));
    }

    #[test]
    fn rebalance_replaces_old_weight() {
        let mut t = AggregateTally::empty(ProposalId::new(1), Timestamp::EPOCH);
        t.credit("YES", w("10"), Timestamp::EPOCH).unwrap();
        t.rebalance("YES", w("10"), w("10.0004"), Timestamp::EPOCH).unwrap();
        assert_eq!(t.total_for("YES"), w("10.0004"));
        assert_eq!(t.voter_counts().total, 1);
    }

    #[test]
    fn rebalance_refuses_to_go_negative() {
        let mut t = AggregateTally::empty(ProposalId::new(1), Timestamp::EPOCH);
        t.credit("YES", w("1"), Timestamp::EPOCH).unwrap();
        let err = t.rebalance("YES", w("2"), w("0"), Timestamp::EPOCH).unwrap_err();
        assert!(matches!(err, TypesError::TallyUnderflow { .. }));
        assert_eq!(t.total_for("YES"), w("1"));
    }
}
