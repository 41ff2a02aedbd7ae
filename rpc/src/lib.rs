//! HTTP API for the ballast vote service.
//!
//! Provides endpoints for:
//! - Vote submission
//! - A proposal's tally with its display-currency value
//! - A wallet's own vote and the recent-vote feed
//! - Administration (proposal creation, triggering a reweigh batch)
//! - Prometheus metrics and liveness

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use metrics::{ApiMetrics, NoopMetrics};
pub use server::{router, ApiState, RpcServer, ADMIN_KEY_HEADER};
