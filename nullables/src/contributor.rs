//! Nullable balance source with scripted weight, failures and latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ballast_balances::{BalanceError, WeightContributor};
use ballast_types::{WalletAddress, Weight};

use crate::lock;

/// A weight contributor whose answers are controlled by the test.
pub struct NullContributor {
    name: String,
    weight: Mutex<Weight>,
    per_wallet: Mutex<HashMap<WalletAddress, Weight>>,
    failures_left: AtomicU32,
    always_fail: AtomicBool,
    delay: Mutex<Duration>,
    calls: AtomicU32,
}

impl NullContributor {
    pub fn new(name: &str, weight: Weight) -> Self {
        Self {
            name: name.to_string(),
            weight: Mutex::new(weight),
            per_wallet: Mutex::new(HashMap::new()),
            failures_left: AtomicU32::new(0),
            always_fail: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` lookups with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Fail every lookup until [`recover`](Self::recover) is called.
    pub fn go_down(&self) {
        self.always_fail.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.always_fail.store(false, Ordering::SeqCst);
        self.failures_left.store(0, Ordering::SeqCst);
    }

    pub fn set_weight(&self, weight: Weight) {
        *lock(&self.weight) = weight;
    }

    /// Answer `weight` for `wallet` instead of the default.
    pub fn set_wallet_weight(&self, wallet: WalletAddress, weight: Weight) {
        lock(&self.per_wallet).insert(wallet, weight);
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeightContributor for NullContributor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contribute(&self, wallet: &WalletAddress) -> Result<Weight, BalanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.always_fail.load(Ordering::SeqCst) || scripted_failure {
            return Err(BalanceError::Lookup {
                contributor: self.name.clone(),
                reason: "null source unavailable".to_string(),
                transient: true,
            });
        }
        if let Some(weight) = lock(&self.per_wallet).get(wallet) {
            return Ok(*weight);
        }
        Ok(*lock(&self.weight))
    }
}
