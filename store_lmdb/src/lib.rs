//! LMDB storage backend for the ballast vote ledger.
//!
//! Implements all storage traits from `ballast-store` using the `heed` LMDB
//! bindings. Every logical store maps to one or more named databases inside a
//! single environment, so a vote insert, its index entries and the tally
//! update commit in one write transaction.
//!
//! LMDB admits one write transaction at a time. That writer slot is the
//! exclusive tally lock: it is only requested after every external call has
//! finished, and it is held for read totals → compute → write → commit.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod meta;
pub mod migration;
pub mod proposal;
pub mod tally;
pub mod vote;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, verify_tally, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
