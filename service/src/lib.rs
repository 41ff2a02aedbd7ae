//! Ballast service.
//!
//! Assembles the vote ledger from configuration: LMDB storage, the EVM and
//! validator balance sources, the signature verifier, the reweigh scheduler,
//! the query service and the HTTP API, plus Prometheus metrics and graceful
//! shutdown.

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod shutdown;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use metrics::ServiceMetrics;
pub use service::{BallastService, Ledger};
pub use shutdown::ShutdownController;
