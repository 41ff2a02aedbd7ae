//! Balance Source Adapter.
//!
//! A wallet's voting weight is the sum of every configured contribution:
//! native balances per chain, ERC-20 balances per token, and 32 units per
//! beacon-chain validator whose withdrawal credentials point at the wallet.
//! Every asset counts 1:1 against the base unit.

pub mod aggregator;
pub mod contributor;
pub mod error;
pub mod evm_sources;
pub mod validators;

pub use aggregator::{FailurePolicy, RetryPolicy, WeightAggregator, WeightReport};
pub use contributor::WeightContributor;
pub use error::BalanceError;
pub use evm_sources::{NativeBalance, TokenBalance};
pub use validators::{BeaconValidatorRegistry, VALIDATOR_PAGE_SIZE};
