//! Proposals: the binary (or n-ary) questions wallets vote on.

use serde::{Deserialize, Serialize};

use crate::{ProposalId, Timestamp};

/// A proposal. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    /// Human-readable question; part of the signed vote message.
    pub description: String,
    /// Allowed option labels, in display order.
    pub options: Vec<String>,
    pub created_at: Timestamp,
}

impl Proposal {
    /// Whether `option` is one of this proposal's labels (exact match).
    pub fn allows(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}
