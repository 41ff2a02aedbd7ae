//! Reweigh Scheduler.
//!
//! Walks the staleness index (oldest `updated_at` first) in bounded
//! batches, recomputes each vote's weight in best-effort mode and hands
//! deltas above the noise threshold to the ledger's locked reweigh.

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::ReweighConfig;
pub use error::ReweighError;
pub use scheduler::{BatchReport, ReweighScheduler};
