//! Solana JSON-RPC client with endpoint fallback.
//!
//! Every call walks the configured endpoints in order, starting with the one
//! that answered last. Failures on one endpoint (throttling, transport errors,
//! bad bodies, RPC errors) move on to the next; a call that no endpoint could
//! answer yields `None` rather than an error.

use crate::config::SyncConfig;
use async_trait::async_trait;
use memo_sync_types::{DEFAULT_COMMITMENT, JsonRpcRequest, SignatureInfo};
use reqwest::header;
use serde_json::{Value, json};
use std::time::Duration;

/// Raw HTTP response as seen by the client
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one JSON body to one endpoint
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<TransportResponse, String>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<TransportResponse, String> {
        let response = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        Ok(TransportResponse { status, body })
    }
}

/// Outcome of a single endpoint attempt
#[derive(Debug)]
enum Attempt {
    Success(Value),
    RateLimited,
    Failed(String),
}

fn classify(response: TransportResponse) -> Attempt {
    if response.status == 429 {
        return Attempt::RateLimited;
    }

    let mut json: Value = match serde_json::from_str(&response.body) {
        Ok(v) => v,
        Err(e) => {
            return Attempt::Failed(format!(
                "Invalid JSON (HTTP {}): {}",
                response.status, e
            ));
        }
    };

    if let Some(result) = json.get_mut("result") {
        return Attempt::Success(result.take());
    }

    match json.get("error") {
        Some(err) => {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.to_string());
            Attempt::Failed(format!("RPC error: {}", message))
        }
        None => Attempt::Failed(format!(
            "Response without result (HTTP {})",
            response.status
        )),
    }
}

pub struct LedgerClient<T: RpcTransport> {
    transport: T,
    endpoints: Vec<String>,
    /// Endpoint of the most recent successful call
    active_endpoint: Option<String>,
    request_count: u64,
    rate_limit_backoff: Duration,
}

impl<T: RpcTransport> LedgerClient<T> {
    pub fn new(transport: T, config: &SyncConfig) -> Self {
        Self {
            transport,
            endpoints: config.rpc_endpoints.clone(),
            active_endpoint: None,
            request_count: 0,
            rate_limit_backoff: config.rate_limit_backoff,
        }
    }

    /// HTTP attempts issued so far, across all endpoints
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn active_endpoint(&self) -> Option<&str> {
        self.active_endpoint.as_deref()
    }

    /// Endpoints in the order the next call will try them
    pub fn try_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.endpoints.len());
        if let Some(active) = &self.active_endpoint {
            if self.endpoints.contains(active) {
                order.push(active.clone());
            }
        }
        for endpoint in &self.endpoints {
            if Some(endpoint) != self.active_endpoint.as_ref() {
                order.push(endpoint.clone());
            }
        }
        order
    }

    /// Make an RPC call with automatic endpoint fallback.
    ///
    /// A `result` of `null` is a successful answer meaning "no data" and is
    /// returned as `None` without trying further endpoints.
    pub async fn call(&mut self, method: &str, params: Value) -> Option<Value> {
        let body = match serde_json::to_value(JsonRpcRequest::new(method, params)) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("[RPC] Failed to encode {} request: {}", method, e);
                return None;
            }
        };

        for endpoint in self.try_order() {
            self.request_count += 1;

            let attempt = match self.transport.post_json(&endpoint, &body).await {
                Ok(response) => classify(response),
                Err(e) => Attempt::Failed(e),
            };

            match attempt {
                Attempt::Success(result) => {
                    self.active_endpoint = Some(endpoint);
                    return if result.is_null() { None } else { Some(result) };
                }
                Attempt::RateLimited => {
                    log::debug!("[RPC] {} rate limited on {}", method, endpoint);
                    if !self.rate_limit_backoff.is_zero() {
                        tokio::time::sleep(self.rate_limit_backoff).await;
                    }
                }
                Attempt::Failed(e) => {
                    log::debug!("[RPC] {} failed on {}: {}", method, endpoint, e);
                }
            }
        }

        log::debug!("[RPC] {} got no answer from any endpoint", method);
        None
    }

    /// One page of signatures for `address`, newest first, older than `before`
    pub async fn get_signatures_for_address(
        &mut self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Option<Vec<SignatureInfo>> {
        let mut options = json!({
            "limit": limit,
            "commitment": DEFAULT_COMMITMENT,
        });
        if let Some(cursor) = before {
            options["before"] = json!(cursor);
        }

        let result = self
            .call("getSignaturesForAddress", json!([address, options]))
            .await?;

        match serde_json::from_value(result) {
            Ok(page) => Some(page),
            Err(e) => {
                log::debug!("[RPC] Unreadable signature page: {}", e);
                None
            }
        }
    }

    /// Full transaction in `jsonParsed` encoding
    pub async fn get_transaction(&mut self, signature: &str) -> Option<Value> {
        self.call(
            "getTransaction",
            json!([
                signature,
                {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": 0,
                    "commitment": DEFAULT_COMMITMENT,
                }
            ]),
        )
        .await
    }
}
