//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use ballast_ledger::VoteLedger;
use ballast_query::QueryService;
use ballast_reweigh::ReweighScheduler;
use ballast_store::LedgerStore;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::RpcError;
use crate::handlers;
use crate::metrics::ApiMetrics;

/// Header carrying the administrator key on `/api/admin/*` routes.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Everything a request handler can reach.
pub struct ApiState<S> {
    pub ledger: Arc<VoteLedger<S>>,
    pub query: Arc<QueryService<S>>,
    pub reweigh: Arc<ReweighScheduler<S>>,
    /// Admin routes are refused when no key is configured.
    pub admin_key: Option<String>,
    pub metrics: Arc<dyn ApiMetrics>,
}

/// Build the router with every route.
pub fn router<S: LedgerStore + 'static>(state: Arc<ApiState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/votes", post(handlers::submit_vote::<S>))
        .route("/api/votes/:proposal", get(handlers::recent_votes::<S>))
        .route("/api/votes/:proposal/:wallet", get(handlers::wallet_vote::<S>))
        .route("/api/aggregate/:proposal", get(handlers::aggregate::<S>))
        .route("/api/admin/proposals", post(handlers::create_proposal::<S>))
        .route("/api/admin/votes/update", post(handlers::run_reweigh::<S>))
        .route("/metrics", get(handlers::metrics::<S>))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
}

impl RpcServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Serve `app` until `shutdown` resolves, then drain in-flight requests.
    pub async fn start(
        &self,
        app: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RpcError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Internal(format!("bind {addr}: {e}")))?;
        info!(%addr, "HTTP API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Internal(e.to_string()))
    }
}
