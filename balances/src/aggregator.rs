//! Concurrent fan-out over every contributor with per-lookup isolation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ballast_types::{WalletAddress, Weight};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{BalanceError, WeightContributor};

/// How partial source failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failed lookup fails the whole computation. Used for first casts.
    Strict,
    /// Failed lookups contribute zero. Fails only when every lookup failed.
    BestEffort,
}

/// Bounded retry applied to each lookup independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(10),
            backoff: Duration::from_millis(250),
        }
    }
}

/// Result of a weight computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightReport {
    pub total: Weight,
    /// Successful contributions by contributor name, in configuration order.
    pub contributions: Vec<(String, Weight)>,
    /// Names of contributors whose lookup failed (counted as zero).
    pub failures: Vec<String>,
    pub sources_version: u32,
}

impl WeightReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sums every contributor's lookup into one weight.
///
/// The contributor list is fixed at construction; `sources_version` names
/// that list so operators can tell which configuration produced a weight.
pub struct WeightAggregator {
    contributors: Vec<Arc<dyn WeightContributor>>,
    retry: RetryPolicy,
    sources_version: u32,
    failed_lookups: AtomicU64,
}

impl WeightAggregator {
    pub fn new(
        contributors: Vec<Arc<dyn WeightContributor>>,
        retry: RetryPolicy,
        sources_version: u32,
    ) -> Self {
        Self {
            contributors,
            retry,
            sources_version,
            failed_lookups: AtomicU64::new(0),
        }
    }

    pub fn contributor_names(&self) -> Vec<String> {
        self.contributors.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn sources_version(&self) -> u32 {
        self.sources_version
    }

    /// Lookups that failed after all retries, since construction.
    pub fn failed_lookups(&self) -> u64 {
        self.failed_lookups.load(Ordering::Relaxed)
    }

    /// Compute the wallet's weight across all sources concurrently.
    pub async fn compute_weight(
        &self,
        wallet: &WalletAddress,
        policy: FailurePolicy,
    ) -> Result<WeightReport, BalanceError> {
        let lookups = self
            .contributors
            .iter()
            .map(|c| lookup_with_retry(c.as_ref(), wallet, self.retry));
        let results = join_all(lookups).await;

        let mut total = Weight::ZERO;
        let mut contributions = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (contributor, result) in self.contributors.iter().zip(results) {
            match result {
                Ok(weight) => {
                    total = total.checked_add(weight).ok_or(BalanceError::Overflow)?;
                    contributions.push((contributor.name().to_string(), weight));
                }
                Err(BalanceError::Overflow) => return Err(BalanceError::Overflow),
                Err(e) => {
                    warn!(
                        wallet = %wallet,
                        source = contributor.name(),
                        error = %e,
                        "balance lookup failed"
                    );
                    self.failed_lookups.fetch_add(1, Ordering::Relaxed);
                    failures.push(contributor.name().to_string());
                }
            }
        }

        let all_failed = !self.contributors.is_empty() && failures.len() == self.contributors.len();
        match policy {
            FailurePolicy::Strict if !failures.is_empty() => {
                return Err(BalanceError::SourceUnavailable { failed: failures })
            }
            FailurePolicy::BestEffort if all_failed => {
                return Err(BalanceError::SourceUnavailable { failed: failures })
            }
            _ => {}
        }

        debug!(
            wallet = %wallet,
            weight = %total,
            failed = failures.len(),
            "weight computed"
        );
        Ok(WeightReport {
            total,
            contributions,
            failures,
            sources_version: self.sources_version,
        })
    }
}

async fn lookup_with_retry(
    contributor: &dyn WeightContributor,
    wallet: &WalletAddress,
    retry: RetryPolicy,
) -> Result<Weight, BalanceError> {
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let call = contributor.contribute(wallet);
        let result = match tokio::time::timeout(retry.attempt_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BalanceError::Timeout {
                contributor: contributor.name().to_string(),
            }),
        };
        match result {
            Ok(weight) => return Ok(weight),
            Err(e) if e.is_transient() && attempt < attempts => {
                debug!(source = contributor.name(), attempt, error = %e, "retrying balance lookup");
                attempt += 1;
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        name: String,
        weight: Weight,
        failures_left: AtomicU32,
        permanent: bool,
        delay: Duration,
        calls: AtomicU32,
    }

    impl Scripted {
        fn base(name: &str, units: &str) -> Self {
            Self {
                name: name.to_string(),
                weight: Weight::parse_decimal(units).unwrap(),
                failures_left: AtomicU32::new(0),
                permanent: false,
                delay: Duration::ZERO,
                calls: AtomicU32::new(0),
            }
        }

        fn ok(name: &str, units: &str) -> Arc<Self> {
            Arc::new(Self::base(name, units))
        }

        fn flaky(name: &str, units: &str, failures: u32) -> Arc<Self> {
            let s = Self::base(name, units);
            s.failures_left.store(failures, Ordering::SeqCst);
            Arc::new(s)
        }

        fn broken(name: &str) -> Arc<Self> {
            Arc::new(Self {
                permanent: true,
                ..Self::base(name, "0")
            })
        }

        fn slow(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::base(name, "1")
            })
        }
    }

    #[async_trait]
    impl WeightContributor for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn contribute(&self, _wallet: &WalletAddress) -> Result<Weight, BalanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.permanent {
                return Err(BalanceError::Lookup {
                    contributor: self.name.clone(),
                    reason: "bad request".into(),
                    transient: false,
                });
            }
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(BalanceError::Lookup {
                    contributor: self.name.clone(),
                    reason: "503".into(),
                    transient: true,
                });
            }
            Ok(self.weight)
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(200),
            backoff: Duration::from_millis(1),
        }
    }

    fn aggregator(contributors: Vec<Arc<dyn WeightContributor>>) -> WeightAggregator {
        WeightAggregator::new(contributors, fast_retry(), 1)
    }

    #[tokio::test]
    async fn sums_all_sources() {
        let agg = aggregator(vec![
            Scripted::ok("native:ethereum", "2.0"),
            Scripted::ok("steth:ethereum", "1.5"),
            Scripted::ok("beacon-validators", "32"),
        ]);
        let report = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::Strict)
            .await
            .unwrap();
        assert_eq!(report.total, Weight::parse_decimal("35.5").unwrap());
        assert_eq!(report.contributions.len(), 3);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let flaky = Scripted::flaky("native:base", "1", 1);
        let agg = aggregator(vec![flaky.clone()]);
        let report = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::Strict)
            .await
            .unwrap();
        assert_eq!(report.total, Weight::from_units(1));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let flaky = Scripted::flaky("native:base", "1", 5);
        let agg = aggregator(vec![flaky.clone()]);
        let err = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::Strict)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BalanceError::SourceUnavailable {
                failed: vec!["native:base".into()]
            }
        );
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let broken = Scripted::broken("weth:arbitrum");
        let agg = aggregator(vec![broken.clone(), Scripted::ok("native:ethereum", "3")]);
        let report = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::BestEffort)
            .await
            .unwrap();
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.total, Weight::from_units(3));
        assert_eq!(report.failures, vec!["weth:arbitrum".to_string()]);
        assert_eq!(agg.failed_lookups(), 1);
    }

    #[tokio::test]
    async fn strict_fails_on_any_missing_source() {
        let agg = aggregator(vec![
            Scripted::broken("weth:arbitrum"),
            Scripted::ok("native:ethereum", "3"),
        ]);
        let result = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::Strict)
            .await;
        assert!(matches!(result, Err(BalanceError::SourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn best_effort_fails_when_everything_failed() {
        let agg = aggregator(vec![Scripted::broken("a"), Scripted::broken("b")]);
        let result = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::BestEffort)
            .await;
        assert!(matches!(
            result,
            Err(BalanceError::SourceUnavailable { failed }) if failed.len() == 2
        ));
    }

    #[tokio::test]
    async fn slow_source_times_out_without_blocking_others() {
        let slow = Scripted::slow("native:linea", Duration::from_secs(5));
        let agg = aggregator(vec![slow, Scripted::ok("native:ethereum", "4")]);
        let started = std::time::Instant::now();
        let report = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::BestEffort)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(report.total, Weight::from_units(4));
        assert_eq!(report.failures, vec!["native:linea".to_string()]);
    }

    #[tokio::test]
    async fn no_contributors_means_zero_weight() {
        let agg = aggregator(vec![]);
        let report = agg
            .compute_weight(&WalletAddress::new([1; 20]), FailurePolicy::Strict)
            .await
            .unwrap();
        assert_eq!(report.total, Weight::ZERO);
    }
}
