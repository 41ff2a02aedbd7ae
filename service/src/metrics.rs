//! Prometheus metrics for the ballast service.
//!
//! [`ServiceMetrics`] owns a dedicated [`Registry`] and backs the HTTP API's
//! [`ApiMetrics`] hooks; `GET /metrics` encodes it in the text exposition
//! format.

use std::sync::Arc;

use ballast_balances::WeightAggregator;
use ballast_ledger::VoteErrorKind;
use ballast_reweigh::BatchReport;
use ballast_rpc::ApiMetrics;
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

use crate::ServiceError;

pub struct ServiceMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub votes_accepted: IntCounter,
    /// Rejected submissions, labelled by error kind.
    pub votes_rejected: IntCounterVec,
    pub reweigh_batches: IntCounter,
    pub reweigh_applied: IntCounter,
    pub reweigh_skipped: IntCounter,
    pub reweigh_failed: IntCounter,
    /// Tally responses valued with a last-known or configured price.
    pub price_fallbacks: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Balance lookups that failed after retries; refreshed on render.
    pub balance_lookup_failures: IntGauge,

    weigher: Arc<WeightAggregator>,
}

impl ServiceMetrics {
    pub fn new(weigher: Arc<WeightAggregator>) -> Result<Self, ServiceError> {
        let registry = Registry::new();

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("ballast_votes_accepted_total", "Votes recorded"),
            registry
        )?;
        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new("ballast_votes_rejected_total", "Vote submissions rejected, by kind"),
            &["kind"],
            registry
        )?;
        let reweigh_batches = register_int_counter_with_registry!(
            Opts::new("ballast_reweigh_batches_total", "Reweigh batches run"),
            registry
        )?;
        let reweigh_applied = register_int_counter_with_registry!(
            Opts::new("ballast_reweigh_applied_total", "Reweighs written to the ledger"),
            registry
        )?;
        let reweigh_skipped = register_int_counter_with_registry!(
            Opts::new(
                "ballast_reweigh_skipped_total",
                "Reweighs skipped as within the noise threshold"
            ),
            registry
        )?;
        let reweigh_failed = register_int_counter_with_registry!(
            Opts::new("ballast_reweigh_failed_total", "Reweighs that could not be weighed or written"),
            registry
        )?;
        let price_fallbacks = register_int_counter_with_registry!(
            Opts::new(
                "ballast_price_fallbacks_total",
                "Tally valuations that used a non-live price"
            ),
            registry
        )?;
        let balance_lookup_failures = register_int_gauge_with_registry!(
            Opts::new(
                "ballast_balance_lookup_failures",
                "Balance source lookups that failed after retries"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            votes_accepted,
            votes_rejected,
            reweigh_batches,
            reweigh_applied,
            reweigh_skipped,
            reweigh_failed,
            price_fallbacks,
            balance_lookup_failures,
            weigher,
        })
    }
}

impl ApiMetrics for ServiceMetrics {
    fn vote_accepted(&self) {
        self.votes_accepted.inc();
    }

    fn vote_rejected(&self, kind: VoteErrorKind) {
        self.votes_rejected.with_label_values(&[kind.as_str()]).inc();
    }

    fn reweigh_batch(&self, report: &BatchReport) {
        self.reweigh_batches.inc();
        self.reweigh_applied.inc_by(report.applied as u64);
        self.reweigh_skipped.inc_by(report.skipped as u64);
        self.reweigh_failed.inc_by(report.failed as u64);
    }

    fn price_fallback(&self) {
        self.price_fallbacks.inc();
    }

    fn render(&self) -> String {
        self.balance_lookup_failures
            .set(i64::try_from(self.weigher.failed_lookups()).unwrap_or(i64::MAX));
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_balances::RetryPolicy;

    fn metrics() -> ServiceMetrics {
        let weigher = Arc::new(WeightAggregator::new(vec![], RetryPolicy::default(), 1));
        ServiceMetrics::new(weigher).unwrap()
    }

    #[test]
    fn counters_show_up_in_exposition() {
        let m = metrics();
        m.vote_accepted();
        m.vote_accepted();
        m.vote_rejected(VoteErrorKind::AlreadyVoted);
        m.price_fallback();
        m.reweigh_batch(&BatchReport {
            examined: 4,
            applied: 1,
            skipped: 2,
            failed: 1,
            wrapped: true,
        });

        let text = m.render();
        assert!(text.contains("ballast_votes_accepted_total 2"));
        assert!(text.contains("ballast_votes_rejected_total{kind=\"already_voted\"} 1"));
        assert!(text.contains("ballast_price_fallbacks_total 1"));
        assert!(text.contains("ballast_reweigh_applied_total 1"));
        assert!(text.contains("ballast_reweigh_skipped_total 2"));
        assert!(text.contains("ballast_balance_lookup_failures 0"));
    }

    #[test]
    fn separate_instances_do_not_share_a_registry() {
        let a = metrics();
        let b = metrics();
        a.vote_accepted();
        assert_eq!(a.votes_accepted.get(), 1);
        assert_eq!(b.votes_accepted.get(), 0);
    }
}
