//! Per-proposal tally locks with a bounded wait.
//!
//! Backends take a proposal's lock for the whole read-totals → compute →
//! write section of `record_vote` and `apply_reweigh`. Locks of different
//! proposals are independent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use ballast_types::ProposalId;

use crate::StoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One mutex per proposal, created on first use.
#[derive(Default)]
pub struct TallyLocks {
    locks: Mutex<HashMap<ProposalId, Arc<Mutex<()>>>>,
}

impl TallyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_proposal(&self, proposal: ProposalId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(proposal)
            .or_default()
            .clone()
    }
}

/// Acquire `mutex`, polling until `timeout` has elapsed. A poisoned mutex
/// is taken over: the data it guards is `()`.
pub fn lock_within(mutex: &Mutex<()>, timeout: Duration) -> Result<MutexGuard<'_, ()>, StoreError> {
    let started = Instant::now();
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(StoreError::LockTimeout { waited });
                }
                thread::sleep(POLL_INTERVAL.min(timeout - waited));
            }
        }
    }
}
