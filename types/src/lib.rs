//! Fundamental types for the ballast weighted vote ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wallet addresses, identifiers, fixed-point weights, timestamps, and the
//! proposal / vote / tally records the ledger persists.

pub mod address;
pub mod error;
pub mod ids;
pub mod proposal;
pub mod tally;
pub mod time;
pub mod vote;
pub mod weight;

pub use address::WalletAddress;
pub use error::TypesError;
pub use ids::{ChainId, ProposalId, VoteId};
pub use proposal::Proposal;
pub use tally::{AggregateTally, VoterCounts};
pub use time::Timestamp;
pub use vote::{NewVote, Vote};
pub use weight::{Weight, WEIGHT_DECIMALS, WEI_PER_UNIT};
