//! Ethereum JSON-RPC over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{RpcError, WalletError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One JSON-RPC endpoint.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Sends `method` with positional `params` and returns the `result`
    /// member, which may be `null`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Endpoint URL, for diagnostics.
    fn url(&self) -> &str;
}

/// Builds a transport for an RPC URL. Connecting performs no I/O.
pub trait Connector: Send + Sync {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcTransport>, WalletError>;
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!(url = %self.url, method, id, "rpc request");

        let response: JsonRpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            let message = match error.data {
                Some(Value::String(data)) if !data.is_empty() => {
                    format!("{} ({data})", error.message)
                }
                _ => error.message,
            };
            return Err(RpcError::from_error_object(error.code, message));
        }
        Ok(response.result)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Connects through one shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcTransport>, WalletError> {
        let url = url::Url::parse(rpc_url)
            .map_err(|e| WalletError::InvalidInput(format!("invalid RPC URL {rpc_url:?}: {e}")))?;
        Ok(Arc::new(HttpTransport::new(self.client.clone(), url.as_str())))
    }
}

// ---------------------------------------------------------------------------
// Hex quantity and data helpers
// ---------------------------------------------------------------------------

fn hex_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, RpcError> {
    value
        .as_str()
        .ok_or_else(|| {
            RpcError::InvalidResponse(format!("{what}: expected hex string, got {value}"))
        })
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

pub fn parse_u256(value: &Value, what: &str) -> Result<U256, RpcError> {
    let digits = strip_0x(hex_str(value, what)?);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("{what}: {e}")))
}

pub fn parse_u64(value: &Value, what: &str) -> Result<u64, RpcError> {
    let digits = strip_0x(hex_str(value, what)?);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::InvalidResponse(format!("{what}: {e}")))
}

pub fn parse_u128(value: &Value, what: &str) -> Result<u128, RpcError> {
    let digits = strip_0x(hex_str(value, what)?);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| RpcError::InvalidResponse(format!("{what}: {e}")))
}

pub fn parse_data(value: &Value, what: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(strip_0x(hex_str(value, what)?))
        .map_err(|e| RpcError::InvalidResponse(format!("{what}: {e}")))
}

pub fn parse_b256(value: &Value, what: &str) -> Result<B256, RpcError> {
    let bytes = parse_data(value, what)?;
    if bytes.len() != 32 {
        return Err(RpcError::InvalidResponse(format!(
            "{what}: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

pub fn quantity(value: U256) -> String {
    format!("0x{value:x}")
}

pub fn data_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn address_hex(address: &Address) -> String {
    address.to_checksum(None)
}
