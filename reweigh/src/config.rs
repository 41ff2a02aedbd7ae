use std::time::Duration;

use ballast_balances::FailurePolicy;
use ballast_types::Weight;

#[derive(Debug, Clone)]
pub struct ReweighConfig {
    /// Rows examined per batch.
    pub batch_size: usize,
    /// Deltas at or below this are skipped without taking the tally lock.
    pub noise_threshold: Weight,
    /// Delay after each applied update within a batch.
    pub pace: Duration,
    pub policy: FailurePolicy,
}

impl Default for ReweighConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            // 0.0001 units
            noise_threshold: Weight::from_wei(100_000_000_000_000),
            pace: Duration::from_millis(100),
            policy: FailurePolicy::BestEffort,
        }
    }
}
