//! JSON-RPC access to the target chain.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Failed to send {method} request: {message}")]
    Transport { method: String, message: String },

    #[error("{method} returned error {code}: {message}")]
    Node {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Failed to decode {method} response: {message}")]
    Decode { method: String, message: String },
}

impl RpcError {
    /// Error message reported by the node itself, if the node answered.
    pub fn node_message(&self) -> Option<&str> {
        match self {
            Self::Node { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    /// `1` on success, `0` when the transaction reverted.
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub status: u64,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub gas_used: u64,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

fn parse_quantity(method: &str, value: &str) -> Result<u128, RpcError> {
    u128::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        message: format!("invalid quantity '{value}': {e}"),
    })
}

/// Read and write access to a chain, as needed to deploy contracts.
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Next nonce for `address`, counting pending transactions.
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn gas_price(&self) -> impl Future<Output = Result<u128, RpcError>> + Send;

    /// Estimate the gas for a call. `to = None` estimates a contract creation.
    fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: &Bytes,
    ) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes, RpcError>> + Send;

    fn send_raw_transaction(
        &self,
        raw: &Bytes,
    ) -> impl Future<Output = Result<B256, RpcError>> + Send;

    /// Receipt for `tx_hash`, or `None` while it is still pending.
    fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, RpcError>> + Send;
}

/// Creates a client for a network's endpoint.
pub trait Connect {
    type Client: ChainClient;

    fn connect(&self, url: &Url) -> Result<Self::Client, RpcError>;
}

/// Connects over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Connect for HttpConnector {
    type Client = JsonRpcClient;

    fn connect(&self, url: &Url) -> Result<JsonRpcClient, RpcError> {
        let client = create_client(self.timeout).map_err(|e| RpcError::Transport {
            method: "connect".to_string(),
            message: e.to_string(),
        })?;
        Ok(JsonRpcClient {
            client,
            url: url.clone(),
        })
    }
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|e| RpcError::Transport {
            method: method.to_string(),
            message: e.to_string(),
        })?;

    let result: Value = response.json().await.map_err(|e| RpcError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })?;

    if let Some(error) = result.get("error") {
        return Err(RpcError::Node {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result.get("result").cloned().unwrap_or(Value::Null);

    serde_json::from_value(result_value).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// Chain client speaking JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: Url,
}

impl JsonRpcClient {
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        tracing::trace!(method, url = %self.url, "JSON-RPC call");
        json_rpc_call(&self.client, &self.url, method, params).await
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<u128, RpcError> {
        let value: String = self.call(method, params).await?;
        parse_quantity(method, &value)
    }

    async fn quantity_u64(&self, method: &str, params: Vec<Value>) -> Result<u64, RpcError> {
        let value = self.quantity(method, params).await?;
        u64::try_from(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }
}

impl ChainClient for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.quantity_u64("eth_chainId", vec![]).await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.quantity_u64("eth_blockNumber", vec![]).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.quantity_u64(
            "eth_getTransactionCount",
            vec![serde_json::json!(address), serde_json::json!("pending")],
        )
        .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.quantity("eth_gasPrice", vec![]).await
    }

    async fn estimate_gas(&self, from: Address, to: Option<Address>, data: &Bytes) -> Result<u64, RpcError> {
        let mut request = serde_json::json!({
            "from": from,
            "data": data,
        });
        if let Some(to) = to {
            request["to"] = serde_json::json!(to);
        }
        self.quantity_u64("eth_estimateGas", vec![request]).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        self.call(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
        self.call("eth_sendRawTransaction", vec![serde_json::json!(raw)])
            .await
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>, RpcError> {
        self.call(
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
    }
}
