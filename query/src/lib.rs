//! Aggregation Query Service.
//!
//! Reads only. Tallies come straight from the store's committed state, so a
//! query never waits on a writer holding a tally lock.

pub mod error;
pub mod oracle;
pub mod service;

pub use error::{OracleError, QueryError};
pub use oracle::{FixedPriceOracle, HttpPriceOracle, PriceOracle};
pub use service::{
    PriceQuote, PriceSource, QueryService, RecentVotes, TallyView, WalletVote,
    DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT,
};
