//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ballast_store::{lock_within, StoreError, TallyLocks};
use ballast_types::ProposalId;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RwTxn};

use crate::keys::decode_u64;
use crate::LmdbError;

/// Number of named databases the ledger opens.
pub const DATABASE_COUNT: u32 = 7;

/// Default memory map size (1 GiB).
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

pub(crate) const NEXT_PROPOSAL_ID_KEY: &str = "next_proposal_id";
pub(crate) const NEXT_VOTE_ID_KEY: &str = "next_vote_id";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    path: PathBuf,
    /// `proposal_be` → bincode `Proposal`
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    /// `vote_id_be` → bincode `Vote`
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// `proposal_be ++ wallet` → `vote_id_be`
    pub(crate) wallet_votes_db: Database<Bytes, Bytes>,
    /// `proposal_be ++ vote_id_be` → empty
    pub(crate) proposal_votes_db: Database<Bytes, Bytes>,
    /// `updated_at_be ++ vote_id_be` → empty
    pub(crate) staleness_db: Database<Bytes, Bytes>,
    /// `proposal_be` → bincode `AggregateTally`
    pub(crate) tallies_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    tally_locks: TallyLocks,
    /// Every write transaction this process opens is taken under this
    /// mutex, so the wait for LMDB's writer slot can be bounded.
    writer: Mutex<()>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path
        // and the memory map is never accessed outside heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASE_COUNT))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let proposals_db = env.create_database(&mut wtxn, Some("proposals"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let wallet_votes_db = env.create_database(&mut wtxn, Some("wallet_votes"))?;
        let proposal_votes_db = env.create_database(&mut wtxn, Some("proposal_votes"))?;
        let staleness_db = env.create_database(&mut wtxn, Some("staleness"))?;
        let tallies_db = env.create_database(&mut wtxn, Some("tallies"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            proposals_db,
            votes_db,
            wallet_votes_db,
            proposal_votes_db,
            staleness_db,
            tallies_db,
            meta_db,
            tally_locks: TallyLocks::new(),
            writer: Mutex::new(()),
        })
    }

    /// Open with the default database count and map size.
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, DATABASE_COUNT, DEFAULT_MAP_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying heed environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Hold `proposal`'s tally lock while `f` runs.
    pub fn with_tally_locked<R>(&self, proposal: ProposalId, f: impl FnOnce() -> R) -> R {
        let tally_lock = self.tally_locks.for_proposal(proposal);
        let _guard = tally_lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// The writer slot for writes outside the tally protocol (proposals,
    /// meta keys). These transactions are short and never wait on a tally.
    pub(crate) fn writer_slot(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` in a write transaction under `proposal`'s tally lock and
    /// commit if it returns `Ok`.
    ///
    /// The tally lock and the writer slot are together waited for at most
    /// `lock_timeout`; past that nothing is written and `LockTimeout` is
    /// returned. Writers of other proposals only share the writer slot,
    /// which is held for the transaction alone.
    pub(crate) fn tally_write<T, F>(
        &self,
        proposal: ProposalId,
        lock_timeout: Duration,
        f: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce(&mut RwTxn<'_>) -> Result<T, StoreError>,
    {
        let started = Instant::now();
        let tally_lock = self.tally_locks.for_proposal(proposal);
        let _tally = lock_within(&tally_lock, lock_timeout)?;
        let remaining = lock_timeout.saturating_sub(started.elapsed());
        let _writer = lock_within(&self.writer, remaining).map_err(|_| StoreError::LockTimeout {
            waited: started.elapsed(),
        })?;

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let out = f(&mut wtxn)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(out)
    }

    /// Allocate the next value of a meta counter inside `wtxn`. Counters
    /// start at 1.
    pub(crate) fn next_id(&self, wtxn: &mut RwTxn<'_>, key: &str) -> Result<u64, LmdbError> {
        let current = match self.meta_db.get(wtxn, key.as_bytes())? {
            Some(bytes) => decode_u64(bytes)
                .ok_or_else(|| LmdbError::Serialization(format!("counter '{key}' is malformed")))?,
            None => 1,
        };
        self.meta_db
            .put(wtxn, key.as_bytes(), &(current + 1).to_be_bytes())?;
        Ok(current)
    }
}
