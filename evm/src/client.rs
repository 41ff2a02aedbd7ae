//! HTTP JSON-RPC client for one EVM chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ballast_types::{ChainId, WalletAddress};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hex_quantity::{encode_data, parse_data, parse_quantity};
use crate::EvmError;

/// Default timeout for a single JSON-RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only `eth_call` against a contract.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call(&self, to: &WalletAddress, data: &[u8]) -> Result<Vec<u8>, EvmError>;
}

/// Balance and contract reads on a single chain.
#[async_trait]
pub trait ChainReader: ContractCaller {
    fn chain_name(&self) -> &str;

    fn chain_id(&self) -> ChainId;

    /// Native balance in the chain's smallest unit.
    async fn native_balance(&self, owner: &WalletAddress) -> Result<u128, EvmError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client bound to one chain's endpoint.
pub struct EvmRpcClient {
    http_client: reqwest::Client,
    url: String,
    name: String,
    chain_id: ChainId,
    next_id: AtomicU64,
}

impl EvmRpcClient {
    pub fn new(name: impl Into<String>, chain_id: ChainId, url: impl Into<String>) -> Self {
        Self::with_timeout(name, chain_id, url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        name: impl Into<String>,
        chain_id: ChainId,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            name: name.into(),
            chain_id,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, EvmError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(EvmError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response.json().await.map_err(|e| {
            EvmError::InvalidResponse(format!("failed to parse {method} response: {e}"))
        })?;

        if let Some(err) = parsed.error {
            return Err(EvmError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| EvmError::InvalidResponse(format!("{method} returned no result")))
    }
}

fn map_transport_error(e: reqwest::Error) -> EvmError {
    if e.is_timeout() {
        EvmError::Timeout
    } else if e.is_connect() {
        EvmError::Unreachable(format!("connection failed: {e}"))
    } else {
        EvmError::RequestFailed(e.to_string())
    }
}

fn expect_str(value: &Value) -> Result<&str, EvmError> {
    value
        .as_str()
        .ok_or_else(|| EvmError::InvalidResponse(format!("expected hex string, got {value}")))
}

#[async_trait]
impl ContractCaller for EvmRpcClient {
    async fn call(&self, to: &WalletAddress, data: &[u8]) -> Result<Vec<u8>, EvmError> {
        let params = json!([{ "to": to.to_string(), "data": encode_data(data) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        parse_data(expect_str(&result)?)
    }
}

#[async_trait]
impl ChainReader for EvmRpcClient {
    fn chain_name(&self) -> &str {
        &self.name
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn native_balance(&self, owner: &WalletAddress) -> Result<u128, EvmError> {
        let params = json!([owner.to_string(), "latest"]);
        let result = self.request("eth_getBalance", params).await?;
        parse_quantity(expect_str(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_as_jsonrpc() {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_getBalance",
            params: json!(["0x00", "latest"]),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["method"], "eth_getBalance");
        assert_eq!(v["params"][1], "latest");
    }

    #[test]
    fn error_body_is_parsed() {
        let r: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#,
        )
        .unwrap();
        assert!(r.result.is_none());
        assert_eq!(r.error.unwrap().code, -32000);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let client = EvmRpcClient::with_timeout(
            "local",
            ChainId::ETHEREUM,
            "http://127.0.0.1:1",
            Duration::from_millis(500),
        );
        let owner = WalletAddress::new([1; 20]);
        let err = client.native_balance(&owner).await.unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
        assert_eq!(client.chain_name(), "local");
    }
}
