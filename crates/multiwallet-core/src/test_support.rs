//! In-process doubles for the network seams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{RpcError, WalletError};
use crate::rpc::{Connector, RpcTransport};

pub const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

type Handler = dyn Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync;

/// Answers every request through a handler and records the traffic.
pub struct MockTransport {
    url: String,
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            url: "mock://rpc".to_string(),
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let result = (self.handler)(method, &params);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((method.to_string(), params));
        }
        result
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Hands out one shared transport and remembers which URLs were requested.
pub struct MockConnector {
    transport: Arc<MockTransport>,
    urls: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl Connector for MockConnector {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcTransport>, WalletError> {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(rpc_url.to_string());
        }
        Ok(self.transport.clone())
    }
}

pub fn method_not_found(method: &str) -> RpcError {
    RpcError::Rpc {
        code: -32601,
        message: format!("method {method} not mocked"),
    }
}
