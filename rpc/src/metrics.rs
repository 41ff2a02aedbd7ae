//! Hooks the API reports through; the service backs them with Prometheus.

use ballast_ledger::VoteErrorKind;
use ballast_reweigh::BatchReport;

pub trait ApiMetrics: Send + Sync {
    fn vote_accepted(&self) {}

    fn vote_rejected(&self, _kind: VoteErrorKind) {}

    fn reweigh_batch(&self, _report: &BatchReport) {}

    /// The tally endpoint answered with a non-live price.
    fn price_fallback(&self) {}

    /// Text exposition for `GET /metrics`.
    fn render(&self) -> String {
        String::new()
    }
}

/// Metrics that go nowhere.
pub struct NoopMetrics;

impl ApiMetrics for NoopMetrics {}
