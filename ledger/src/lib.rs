//! Vote Ledger.
//!
//! Accepts vote submissions and reweighs. Every external call (signature
//! check, balance fan-out) completes before the store's exclusive tally
//! section is entered; the store then re-checks uniqueness, writes the vote
//! and updates the running tally atomically.

pub mod config;
pub mod error;
pub mod submission;
pub mod vote_ledger;

pub use config::LedgerConfig;
pub use error::{VoteError, VoteErrorKind};
pub use submission::VoteSubmission;
pub use vote_ledger::VoteLedger;
