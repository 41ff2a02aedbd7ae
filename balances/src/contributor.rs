use async_trait::async_trait;
use ballast_types::{WalletAddress, Weight};

use crate::BalanceError;

/// One independently failing source of voting weight.
#[async_trait]
pub trait WeightContributor: Send + Sync {
    /// Stable name used in logs and failure reports, e.g. `native:base`.
    fn name(&self) -> &str;

    /// The wallet's contribution, already normalised to 18 decimals.
    async fn contribute(&self, wallet: &WalletAddress) -> Result<Weight, BalanceError>;
}
