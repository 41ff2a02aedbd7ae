use std::time::Duration;

use ballast_balances::FailurePolicy;
use ballast_types::ChainId;

/// Runtime knobs of the vote ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Longest wait for the tally lock before failing with `LockTimeout`.
    pub lock_timeout: Duration,
    /// Weighing policy for first-time casts.
    pub cast_policy: FailurePolicy,
    /// Chain context recorded on each vote.
    pub cast_chain_id: ChainId,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            cast_policy: FailurePolicy::Strict,
            cast_chain_id: ChainId::ETHEREUM,
        }
    }
}
