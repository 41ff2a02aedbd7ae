//! Abstract storage traits for the ballast vote ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Backends own the locked insert/reweigh protocol: `record_vote` and
//! `apply_reweigh` each run as one atomic unit that serialises with every
//! other mutation of the same proposal's tally.

pub mod error;
pub mod lock;
pub mod meta;
pub mod proposal;
pub mod tally;
pub mod vote;

pub use error::StoreError;
pub use lock::{lock_within, TallyLocks};
pub use meta::{MetaStore, REWEIGH_CURSOR_KEY, SCHEMA_VERSION_KEY};
pub use proposal::ProposalStore;
pub use tally::TallyStore;
pub use vote::{ReweighOutcome, ReweighRequest, StalenessCursor, VoteStore};

/// Everything the ledger, scheduler and query service need from a backend.
pub trait LedgerStore: ProposalStore + VoteStore + TallyStore + MetaStore + Send + Sync {}

impl<T> LedgerStore for T where
    T: ProposalStore + VoteStore + TallyStore + MetaStore + Send + Sync
{
}
