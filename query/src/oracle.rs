//! Display-currency price feeds.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::OracleError;

/// Default timeout for price requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// A read-only price feed for one conversion pair (one weight unit in the
/// display currency).
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price(&self) -> Result<f64, OracleError>;
}

/// Spot-price endpoint answering `{"data": {"amount": "<decimal>"}}`.
pub struct HttpPriceOracle {
    http_client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
}

impl HttpPriceOracle {
    pub fn new(url: &str) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn price(&self) -> Result<f64, OracleError> {
        let response = self.http_client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Unreachable(format!("request timed out: {e}"))
            } else if e.is_connect() {
                OracleError::Unreachable(format!("connection failed: {e}"))
            } else {
                OracleError::RequestFailed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(OracleError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body: SpotResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        let price: f64 = body
            .data
            .amount
            .trim()
            .parse()
            .map_err(|_| OracleError::InvalidResponse(format!("amount '{}'", body.data.amount)))?;
        if !price.is_finite() || price < 0.0 {
            return Err(OracleError::InvalidResponse(format!("price {price}")));
        }
        Ok(price)
    }
}

/// An oracle with a settable answer. Used when no live feed is configured
/// and in tests.
pub struct FixedPriceOracle {
    price: Mutex<Option<f64>>,
}

impl FixedPriceOracle {
    pub fn new(price: f64) -> Self {
        Self {
            price: Mutex::new(Some(price)),
        }
    }

    /// An oracle that always fails.
    pub fn unavailable() -> Self {
        Self {
            price: Mutex::new(None),
        }
    }

    /// Change the answer; `None` makes every request fail.
    pub fn set(&self, price: Option<f64>) {
        *self.price.lock().unwrap_or_else(|e| e.into_inner()) = price;
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn price(&self) -> Result<f64, OracleError> {
        let price = *self.price.lock().unwrap_or_else(|e| e.into_inner());
        price.ok_or_else(|| OracleError::Unreachable("fixed oracle is offline".into()))
    }
}
