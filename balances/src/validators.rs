//! Beacon-chain validator registry lookup.
//!
//! `GET {base}/{wallet}?limit={n}&offset={k}` returns
//! `{"status": "OK", "data": [...]}`; every entry is one validator whose
//! withdrawal credentials point at the wallet. Pages are fetched until one
//! comes back short.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ballast_types::{WalletAddress, Weight};
use serde::Deserialize;

use crate::{BalanceError, WeightContributor};

/// Maximum validators per registry page.
pub const VALIDATOR_PAGE_SIZE: usize = 200;

/// Hard cap on pages walked for one wallet.
const MAX_PAGES: usize = 500;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const NAME: &str = "beacon-validators";

#[derive(Debug, Deserialize)]
struct RegistryPage {
    status: String,
    #[serde(default)]
    data: Vec<serde::de::IgnoredAny>,
}

/// Counts a wallet's validators and credits a fixed amount per validator.
pub struct BeaconValidatorRegistry {
    http_client: reqwest::Client,
    base_url: String,
    page_size: usize,
    per_validator: Weight,
}

impl BeaconValidatorRegistry {
    pub fn new(base_url: impl Into<String>, page_size: usize, per_validator: Weight) -> Self {
        Self::with_timeout(base_url, page_size, per_validator, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        page_size: usize,
        per_validator: Weight,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into(),
            page_size: page_size.max(1),
            per_validator,
        }
    }

    async fn fetch_page(&self, wallet: &WalletAddress, offset: usize) -> Result<usize, BalanceError> {
        let url = format!(
            "{}/{}?limit={}&offset={}",
            self.base_url.trim_end_matches('/'),
            wallet,
            self.page_size,
            offset
        );
        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BalanceError::Timeout {
                        contributor: NAME.to_string(),
                    }
                } else {
                    lookup_error(format!("request failed: {e}"), true)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_error(
                format!("HTTP status {status}"),
                status.is_server_error() || status.as_u16() == 429,
            ));
        }

        let page: RegistryPage = response
            .json()
            .await
            .map_err(|e| lookup_error(format!("failed to parse registry page: {e}"), false))?;
        parse_page(page)
    }
}

fn lookup_error(reason: String, transient: bool) -> BalanceError {
    BalanceError::Lookup {
        contributor: NAME.to_string(),
        reason,
        transient,
    }
}

fn parse_page(page: RegistryPage) -> Result<usize, BalanceError> {
    if page.status != "OK" {
        return Err(lookup_error(
            format!("registry status {}", page.status),
            false,
        ));
    }
    Ok(page.data.len())
}

/// Walk registry pages until a short page, returning the validator count.
pub async fn count_validators<F, Fut>(page_size: usize, mut fetch: F) -> Result<u64, BalanceError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<usize, BalanceError>>,
{
    let mut total: u64 = 0;
    let mut offset = 0;
    for _ in 0..MAX_PAGES {
        let len = fetch(offset).await?;
        total += len as u64;
        if len < page_size {
            return Ok(total);
        }
        offset += page_size;
    }
    Err(lookup_error(
        format!("more than {MAX_PAGES} registry pages"),
        false,
    ))
}

#[async_trait]
impl WeightContributor for BeaconValidatorRegistry {
    fn name(&self) -> &str {
        NAME
    }

    async fn contribute(&self, wallet: &WalletAddress) -> Result<Weight, BalanceError> {
        let count = count_validators(self.page_size, |offset| self.fetch_page(wallet, offset)).await?;
        self.per_validator
            .checked_mul(u128::from(count))
            .ok_or(BalanceError::Overflow)
    }
}
