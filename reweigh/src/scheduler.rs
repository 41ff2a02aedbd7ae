use std::sync::Arc;
use std::time::Duration;

use ballast_ledger::{VoteError, VoteLedger};
use ballast_store::{
    LedgerStore, ReweighOutcome, StalenessCursor, StoreError, REWEIGH_CURSOR_KEY,
};
use ballast_types::{Timestamp, Vote, Weight};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{ReweighConfig, ReweighError};

/// Deltas larger than this are logged as notable balance movements.
const LARGE_DELTA: Weight = Weight::from_units(1);

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub examined: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The batch reached the end of the staleness index or the rows this
    /// sweep already refreshed; the next one starts again from the stalest
    /// vote.
    pub wrapped: bool,
}

enum RowOutcome {
    Applied,
    Skipped,
}

/// Drives reweighs through the ledger in paced, bounded batches.
///
/// Progress through the staleness index is kept in the store's meta table,
/// so rows skipped as noise do not pin every batch to the same oldest votes
/// and a restart resumes where the last batch stopped.
///
/// A sweep runs from the stalest vote to the end of the index. Applying a
/// reweigh moves the row to the end, so the sweep stops at the first row
/// refreshed after it began; those rows wait for the next sweep.
pub struct ReweighScheduler<S> {
    ledger: Arc<VoteLedger<S>>,
    config: ReweighConfig,
    /// Serialises batches so concurrent triggers cannot race on the cursor.
    /// Holds the time the current sweep began.
    running: Mutex<Option<Timestamp>>,
}

impl<S> ReweighScheduler<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(ledger: Arc<VoteLedger<S>>, config: ReweighConfig) -> Self {
        Self {
            ledger,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReweighConfig {
        &self.config
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, ReweighError>
    where
        F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.ledger.store().clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ReweighError::Task(e.to_string()))?
            .map_err(ReweighError::from)
    }

    async fn load_cursor(&self) -> Result<Option<StalenessCursor>, ReweighError> {
        let raw = self
            .with_store(|s| match s.get_meta(REWEIGH_CURSOR_KEY) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(StoreError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            })
            .await?;
        match raw.map(|bytes| StalenessCursor::from_bytes(&bytes)) {
            None => Ok(None),
            Some(Ok(cursor)) => Ok(Some(cursor)),
            Some(Err(e)) => {
                warn!(error = %e, "discarding unreadable reweigh cursor");
                Ok(None)
            }
        }
    }

    async fn save_cursor(&self, cursor: Option<StalenessCursor>) -> Result<(), ReweighError> {
        self.with_store(move |s| match cursor {
            Some(cursor) => s.put_meta(REWEIGH_CURSOR_KEY, &cursor.to_bytes()),
            None => s.delete_meta(REWEIGH_CURSOR_KEY),
        })
        .await
    }

    /// Run one batch: examine up to `batch_size` of the stalest votes past
    /// the saved cursor and reweigh those whose weight moved by more than
    /// the noise threshold.
    pub async fn run_batch(&self) -> Result<BatchReport, ReweighError> {
        let mut sweep_started = self.running.lock().await;

        let limit = self.config.batch_size.max(1);
        let after = self.load_cursor().await?;
        let mut batch = self.with_store(move |s| s.stale_votes(after, limit)).await?;
        let mut new_sweep = after.is_none();
        if batch.is_empty() && after.is_some() {
            batch = self.with_store(move |s| s.stale_votes(None, limit)).await?;
            new_sweep = true;
        }
        if new_sweep {
            *sweep_started = None;
        }
        let started = *sweep_started.get_or_insert_with(|| self.ledger.clock().now());

        let full = batch.len() == limit;
        let revisited = batch.iter().position(|vote| vote.updated_at > started);
        if let Some(end) = revisited {
            debug!(skipped = batch.len() - end, "sweep reached rows refreshed since it began");
            batch.truncate(end);
        }

        let mut report = BatchReport {
            examined: batch.len(),
            wrapped: revisited.is_some() || !full,
            ..BatchReport::default()
        };

        let last = batch.len().saturating_sub(1);
        for (i, vote) in batch.iter().enumerate() {
            match self.reweigh_row(vote).await {
                Ok(RowOutcome::Applied) => {
                    report.applied += 1;
                    if i < last && !self.config.pace.is_zero() {
                        tokio::time::sleep(self.config.pace).await;
                    }
                }
                Ok(RowOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(vote_id = %vote.id, wallet = %vote.wallet, error = %e, "reweigh failed");
                }
            }
        }

        let next = if report.wrapped {
            None
        } else {
            batch.last().map(StalenessCursor::of)
        };
        self.save_cursor(next).await?;

        info!(
            examined = report.examined,
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            wrapped = report.wrapped,
            "reweigh batch finished"
        );
        Ok(report)
    }

    async fn reweigh_row(&self, vote: &Vote) -> Result<RowOutcome, VoteError> {
        let report = self.ledger.weigh(&vote.wallet, self.config.policy).await?;
        if !report.is_complete() {
            debug!(vote_id = %vote.id, failed = ?report.failures, "partial weight");
        }
        let new_weight = report.total;
        if vote.weight.abs_diff(new_weight) <= self.config.noise_threshold {
            return Ok(RowOutcome::Skipped);
        }

        match self
            .ledger
            .reweigh_vote(vote.id, new_weight, self.config.noise_threshold)
            .await?
        {
            ReweighOutcome::Applied { old, new } => {
                let delta = old.delta_to(new);
                if old.abs_diff(new) > LARGE_DELTA {
                    warn!(
                        vote_id = %vote.id,
                        wallet = %vote.wallet,
                        old = %old,
                        new = %new,
                        delta,
                        "large weight change"
                    );
                } else {
                    debug!(vote_id = %vote.id, old = %old, new = %new, delta, "weight refreshed");
                }
                Ok(RowOutcome::Applied)
            }
            ReweighOutcome::Skipped { .. } => Ok(RowOutcome::Skipped),
        }
    }

    /// Run batches every `interval` until `shutdown` fires, handing each
    /// finished batch's report to `on_batch`.
    pub async fn run_loop<F>(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
        on_batch: F,
    ) where
        F: Fn(&BatchReport) + Send + Sync,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("reweigh loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_batch().await {
                        Ok(report) => on_batch(&report),
                        Err(e) => warn!(error = %e, "reweigh batch aborted"),
                    }
                }
            }
        }
    }
}
