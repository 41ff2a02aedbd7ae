use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] ballast_store::StoreError),

    #[error("storage error: {0}")]
    Lmdb(#[from] ballast_store_lmdb::LmdbError),

    #[error("data directory unusable: {0}")]
    DataDir(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] ballast_rpc::RpcError),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("reweigh error: {0}")]
    Reweigh(#[from] ballast_reweigh::ReweighError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<prometheus::Error> for ServiceError {
    fn from(e: prometheus::Error) -> Self {
        ServiceError::Metrics(e.to_string())
    }
}
