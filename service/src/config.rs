//! Service configuration with TOML file support.
//!
//! Every field has a serde default, so an empty file describes a working
//! mainnet deployment apart from the RPC API key.

use std::path::PathBuf;
use std::time::Duration;

use ballast_balances::{FailurePolicy, RetryPolicy};
use ballast_ledger::LedgerConfig;
use ballast_reweigh::ReweighConfig;
use ballast_types::{ChainId, Weight};
use ballast_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Placeholder in chain URLs replaced by `rpc_api_key`.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Configuration for a ballast service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Key expected in the `x-admin-key` header. Admin routes are disabled
    /// when unset.
    #[serde(default)]
    pub admin_key: Option<String>,

    /// Substituted for `{api_key}` in chain RPC URLs.
    #[serde(default)]
    pub rpc_api_key: Option<String>,

    /// Chain recorded on every vote as its cast context.
    #[serde(default = "default_chain_id")]
    pub cast_chain_id: u64,

    /// Chain on which contract-wallet signatures are checked.
    #[serde(default = "default_chain_id")]
    pub signature_chain_id: u64,

    /// Names the `chains` + `validator_registry` source set.
    #[serde(default = "default_sources_version")]
    pub sources_version: u32,

    /// How long a write may wait for a proposal's tally lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_chains")]
    pub chains: Vec<ChainConfig>,

    #[serde(default)]
    pub validator_registry: ValidatorRegistryConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub weigh_policy: WeighPolicyConfig,

    #[serde(default)]
    pub reweigh: ReweighSection,

    #[serde(default)]
    pub price_oracle: PriceOracleConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRegistryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Weight credited per validator, as a decimal string.
    #[serde(default = "default_per_validator")]
    pub per_validator: String,
}

impl Default for ValidatorRegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_registry_url(),
            page_size: default_page_size(),
            per_validator: default_per_validator(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Which failure policy each weighing path uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeighPolicyConfig {
    #[serde(default = "default_cast_policy")]
    pub cast: FailurePolicy,
    #[serde(default = "default_reweigh_policy")]
    pub reweigh: FailurePolicy,
}

impl Default for WeighPolicyConfig {
    fn default() -> Self {
        Self {
            cast: default_cast_policy(),
            reweigh: default_reweigh_policy(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReweighSection {
    /// Run batches on an interval inside `serve`.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Decimal string, e.g. "0.0001".
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: String,
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReweighSection {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
            noise_threshold: default_noise_threshold(),
            pace_ms: default_pace_ms(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceOracleConfig {
    /// Spot-price URL; when unset the fallback price is always used.
    #[serde(default = "default_oracle_url")]
    pub url: Option<String>,
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PriceOracleConfig {
    fn default() -> Self {
        Self {
            url: default_oracle_url(),
            fallback_price: default_fallback_price(),
            timeout_ms: default_oracle_timeout_ms(),
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ballast_data")
}

fn default_rpc_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chain_id() -> u64 {
    ChainId::ETHEREUM.get()
}

fn default_sources_version() -> u32 {
    1
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_decimals() -> u32 {
    18
}

fn default_true() -> bool {
    true
}

fn default_registry_url() -> String {
    "https://beaconcha.in/api/v1/validator/withdrawalCredentials".to_string()
}

fn default_page_size() -> usize {
    200
}

fn default_per_validator() -> String {
    "32".to_string()
}

fn default_max_attempts() -> u32 {
    2
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

fn default_backoff_ms() -> u64 {
    250
}

fn default_cast_policy() -> FailurePolicy {
    FailurePolicy::Strict
}

fn default_reweigh_policy() -> FailurePolicy {
    FailurePolicy::BestEffort
}

fn default_batch_size() -> usize {
    50
}

fn default_noise_threshold() -> String {
    "0.0001".to_string()
}

fn default_pace_ms() -> u64 {
    1_000
}

fn default_interval_secs() -> u64 {
    60
}

fn default_oracle_url() -> Option<String> {
    Some("https://api.coinbase.com/v2/prices/ETH-USD/spot".to_string())
}

fn default_fallback_price() -> f64 {
    2_500.0
}

fn default_oracle_timeout_ms() -> u64 {
    5_000
}

fn chain(name: &str, chain_id: u64, host: &str, tokens: Vec<TokenConfig>) -> ChainConfig {
    ChainConfig {
        name: name.to_string(),
        chain_id,
        rpc_url: format!("https://{host}.g.alchemy.com/v2/{API_KEY_PLACEHOLDER}"),
        tokens,
    }
}

fn token(symbol: &str, address: &str) -> TokenConfig {
    TokenConfig {
        symbol: symbol.to_string(),
        address: address.to_string(),
        decimals: 18,
    }
}

fn default_chains() -> Vec<ChainConfig> {
    vec![
        chain(
            "ethereum",
            1,
            "eth-mainnet",
            vec![
                token("steth", "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
                token("wsteth", "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0"),
                token("reth", "0xae78736Cd615f374D3085123A210448E74Fc6393"),
                token("cbeth", "0xBe9895146f7AF43049ca1c1AE358B0541Ea49704"),
                token("weth", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            ],
        ),
        chain("base", 8453, "base-mainnet", vec![]),
        chain("optimism", 10, "opt-mainnet", vec![]),
        chain("arbitrum", 42161, "arb-mainnet", vec![]),
        chain("polygon", 137, "polygon-mainnet", vec![]),
        chain("zksync", 324, "zksync-mainnet", vec![]),
        chain("linea", 59144, "linea-mainnet", vec![]),
        chain("polygon-zkevm", 1101, "polygonzkevm-mainnet", vec![]),
    ]
}

// ── Impl ───────────────────────────────────────────────────────────────

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rpc_port: default_rpc_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            admin_key: None,
            rpc_api_key: None,
            cast_chain_id: default_chain_id(),
            signature_chain_id: default_chain_id(),
            sources_version: default_sources_version(),
            lock_timeout_ms: default_lock_timeout_ms(),
            chains: default_chains(),
            validator_registry: ValidatorRegistryConfig::default(),
            retry: RetryConfig::default(),
            weigh_policy: WeighPolicyConfig::default(),
            reweigh: ReweighSection::default(),
            price_oracle: PriceOracleConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.chains.is_empty() && !self.validator_registry.enabled {
            return Err(ServiceError::Config("no balance sources configured".into()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ServiceError::Config("lock_timeout_ms must be positive".into()));
        }
        if self.reweigh.batch_size == 0 {
            return Err(ServiceError::Config("reweigh.batch_size must be positive".into()));
        }
        self.noise_threshold()?;
        self.per_validator()?;
        for chain in &self.chains {
            for token in &chain.tokens {
                if token.address.parse::<ballast_types::WalletAddress>().is_err() {
                    return Err(ServiceError::Config(format!(
                        "token {} on {} has a bad address '{}'",
                        token.symbol, chain.name, token.address
                    )));
                }
            }
        }
        if self.price_oracle.fallback_price < 0.0 || !self.price_oracle.fallback_price.is_finite() {
            return Err(ServiceError::Config("price_oracle.fallback_price must be >= 0".into()));
        }
        Ok(())
    }

    /// A chain's RPC URL with the API key substituted.
    pub fn resolved_rpc_url(&self, chain: &ChainConfig) -> String {
        match &self.rpc_api_key {
            Some(key) => chain.rpc_url.replace(API_KEY_PLACEHOLDER, key),
            None => chain.rpc_url.clone(),
        }
    }

    pub fn noise_threshold(&self) -> Result<Weight, ServiceError> {
        Weight::parse_decimal(&self.reweigh.noise_threshold).map_err(|e| {
            ServiceError::Config(format!("reweigh.noise_threshold: {e}"))
        })
    }

    pub fn per_validator(&self) -> Result<Weight, ServiceError> {
        Weight::parse_decimal(&self.validator_registry.per_validator).map_err(|e| {
            ServiceError::Config(format!("validator_registry.per_validator: {e}"))
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            attempt_timeout: Duration::from_millis(self.retry.attempt_timeout_ms),
            backoff: Duration::from_millis(self.retry.backoff_ms),
        }
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            cast_policy: self.weigh_policy.cast,
            cast_chain_id: ChainId::new(self.cast_chain_id),
        }
    }

    pub fn reweigh_config(&self) -> Result<ReweighConfig, ServiceError> {
        Ok(ReweighConfig {
            batch_size: self.reweigh.batch_size,
            noise_threshold: self.noise_threshold()?,
            pace: Duration::from_millis(self.reweigh.pace_ms),
            policy: self.weigh_policy.reweigh,
        })
    }
}
