//! The assembled service.
//!
//! Opens storage, builds every balance source from configuration, and owns
//! the ledger, query service, reweigh scheduler and HTTP router built on top.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ballast_balances::{
    BeaconValidatorRegistry, NativeBalance, TokenBalance, WeightAggregator, WeightContributor,
};
use ballast_evm::{ChainReader, ContractCaller, EvmRpcClient};
use ballast_ledger::VoteLedger;
use ballast_query::{FixedPriceOracle, HttpPriceOracle, PriceOracle, QueryService};
use ballast_reweigh::ReweighScheduler;
use ballast_rpc::{router, ApiMetrics, ApiState, RpcServer};
use ballast_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment, Migrator};
use ballast_types::{ChainId, WalletAddress};
use ballast_utils::SystemClock;
use ballast_verification::SignatureVerifier;
use tracing::{error, info, warn};

use crate::{ServiceConfig, ServiceError, ServiceMetrics, ShutdownController};

pub type Ledger = VoteLedger<LmdbEnvironment>;

pub struct BallastService {
    config: ServiceConfig,
    store: Arc<LmdbEnvironment>,
    ledger: Arc<Ledger>,
    query: Arc<QueryService<LmdbEnvironment>>,
    scheduler: Arc<ReweighScheduler<LmdbEnvironment>>,
    metrics: Arc<ServiceMetrics>,
    shutdown: ShutdownController,
}

impl BallastService {
    /// Open storage and build every component. Fails before anything is
    /// served if the data directory, schema or configuration is unusable.
    pub fn build(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        check_data_dir(&config.data_dir).map_err(ServiceError::DataDir)?;

        let store = Arc::new(LmdbEnvironment::open_default(&config.data_dir)?);
        Migrator::run(store.as_ref())?;
        let integrity = check_integrity(&store)?;
        if !integrity.is_healthy() {
            return Err(ServiceError::Integrity(integrity.errors.join("; ")));
        }
        info!(
            path = %config.data_dir.display(),
            databases = integrity.databases_checked,
            entries = integrity.total_entries,
            "ledger storage opened"
        );

        let timeout = Duration::from_millis(config.retry.attempt_timeout_ms);
        let clients = build_chain_clients(&config, timeout);
        let contributors = build_contributors(&config, &clients, timeout)?;
        info!(
            sources = contributors.len(),
            version = config.sources_version,
            "balance sources configured"
        );
        let weigher = Arc::new(WeightAggregator::new(
            contributors,
            config.retry_policy(),
            config.sources_version,
        ));

        let caller: Arc<dyn ContractCaller> = clients
            .get(&config.signature_chain_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::Config(format!(
                    "signature_chain_id {} has no configured chain",
                    config.signature_chain_id
                ))
            })?;
        let verifier = Arc::new(SignatureVerifier::new(caller));

        let ledger = Arc::new(VoteLedger::new(
            store.clone(),
            weigher.clone(),
            verifier,
            Arc::new(SystemClock),
            config.ledger_config(),
        ));

        let oracle: Arc<dyn PriceOracle> = match &config.price_oracle.url {
            Some(url) => Arc::new(HttpPriceOracle::with_timeout(
                url,
                Duration::from_millis(config.price_oracle.timeout_ms),
            )),
            None => Arc::new(FixedPriceOracle::unavailable()),
        };
        let query = Arc::new(QueryService::new(
            store.clone(),
            oracle,
            config.price_oracle.fallback_price,
        ));

        let scheduler = Arc::new(ReweighScheduler::new(ledger.clone(), config.reweigh_config()?));
        let metrics = Arc::new(ServiceMetrics::new(weigher)?);

        Ok(Self {
            config,
            store,
            ledger,
            query,
            scheduler,
            metrics,
            shutdown: ShutdownController::new(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LmdbEnvironment> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn query(&self) -> &Arc<QueryService<LmdbEnvironment>> {
        &self.query
    }

    pub fn scheduler(&self) -> &Arc<ReweighScheduler<LmdbEnvironment>> {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// The HTTP router over this service's components.
    pub fn router(&self) -> axum::Router {
        let metrics: Arc<dyn ApiMetrics> = self.metrics.clone();
        router(Arc::new(ApiState {
            ledger: self.ledger.clone(),
            query: self.query.clone(),
            reweigh: self.scheduler.clone(),
            admin_key: self.config.admin_key.clone(),
            metrics,
        }))
    }

    /// Serve the HTTP API, and the reweigh loop when enabled, until
    /// SIGINT/SIGTERM or [`ShutdownController::shutdown`].
    pub async fn run(&self) -> Result<(), ServiceError> {
        if self.config.admin_key.as_deref().map_or(true, str::is_empty) {
            warn!("no admin_key configured; admin routes are disabled");
        }

        let reweigh_task = if self.config.reweigh.enabled {
            let scheduler = self.scheduler.clone();
            let metrics = self.metrics.clone();
            let interval = Duration::from_secs(self.config.reweigh.interval_secs.max(1));
            let rx = self.shutdown.subscribe();
            info!(interval_secs = interval.as_secs(), "reweigh loop enabled");
            Some(tokio::spawn(async move {
                scheduler
                    .run_loop(interval, rx, |report| metrics.reweigh_batch(report))
                    .await
            }))
        } else {
            None
        };

        let signals = {
            let controller = self.shutdown.clone();
            tokio::spawn(async move { controller.wait_for_signal().await })
        };

        let mut stop_rx = self.shutdown.subscribe();
        let stop = async move {
            let _ = stop_rx.recv().await;
        };
        let served = RpcServer::new(self.config.rpc_port)
            .start(self.router(), stop)
            .await;

        // A bind failure returns before any signal; stop the other tasks too.
        self.shutdown.shutdown();
        signals.abort();
        if let Some(task) = reweigh_task {
            if let Err(e) = task.await {
                error!(error = %e, "reweigh loop task failed");
            }
        }
        served?;
        info!("service stopped");
        Ok(())
    }
}

/// One JSON-RPC client per configured chain, keyed by chain id.
fn build_chain_clients(config: &ServiceConfig, timeout: Duration) -> HashMap<u64, Arc<EvmRpcClient>> {
    config
        .chains
        .iter()
        .map(|chain| {
            let url = config.resolved_rpc_url(chain);
            if url.contains(crate::config::API_KEY_PLACEHOLDER) {
                warn!(chain = %chain.name, "rpc_url still contains the API key placeholder");
            }
            let client = EvmRpcClient::with_timeout(
                chain.name.clone(),
                ChainId::new(chain.chain_id),
                url,
                timeout,
            );
            (chain.chain_id, Arc::new(client))
        })
        .collect()
}

fn build_contributors(
    config: &ServiceConfig,
    clients: &HashMap<u64, Arc<EvmRpcClient>>,
    timeout: Duration,
) -> Result<Vec<Arc<dyn WeightContributor>>, ServiceError> {
    let mut contributors: Vec<Arc<dyn WeightContributor>> = Vec::new();
    for chain in &config.chains {
        let Some(client) = clients.get(&chain.chain_id) else {
            continue;
        };
        let reader: Arc<dyn ChainReader> = client.clone();
        contributors.push(Arc::new(NativeBalance::new(reader.clone())));
        for token in &chain.tokens {
            let address: WalletAddress = token.address.parse().map_err(|e| {
                ServiceError::Config(format!("token {} on {}: {e}", token.symbol, chain.name))
            })?;
            contributors.push(Arc::new(TokenBalance::new(
                reader.clone(),
                &token.symbol,
                address,
                token.decimals,
            )));
        }
    }

    let registry = &config.validator_registry;
    if registry.enabled {
        contributors.push(Arc::new(BeaconValidatorRegistry::with_timeout(
            registry.base_url.clone(),
            registry.page_size,
            config.per_validator()?,
            timeout,
        )));
    }
    Ok(contributors)
}
