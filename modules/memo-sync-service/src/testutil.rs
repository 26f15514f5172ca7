//! Fake transports shared by the unit tests.

use crate::config::SyncConfig;
use crate::rpc::{RpcTransport, TransportResponse};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MEMO_V1: &str = "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo";

/// Config with the given endpoints and no sleeping
pub fn config_with_endpoints(endpoints: &[&str]) -> SyncConfig {
    SyncConfig {
        rpc_endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
        fetch_delay: Duration::ZERO,
        rate_limit_backoff: Duration::ZERO,
        ..SyncConfig::default()
    }
}

pub fn http(status: u16, body: &str) -> TransportResponse {
    TransportResponse {
        status,
        body: body.to_string(),
    }
}

/// Every request a fake transport received, in order
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl CallLog {
    fn record(&self, endpoint: &str, body: &Value) {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.calls.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.bodies()
            .iter()
            .map(|b| b["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Signatures passed to `getTransaction`
    pub fn fetched_signatures(&self) -> Vec<String> {
        self.bodies()
            .iter()
            .filter(|b| b["method"] == "getTransaction")
            .map(|b| b["params"][0].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// Replays canned responses per endpoint; unscripted requests fail like a dead host
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<TransportResponse>>>,
    log: CallLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, endpoint: &str, response: TransportResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<TransportResponse, String> {
        self.log.record(endpoint, body);
        self.responses
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| "Request failed: connection refused".to_string())
    }
}

/// In-memory ledger answering `getSignaturesForAddress` and `getTransaction`
#[derive(Default)]
pub struct FakeLedger {
    /// Signature entries, newest first
    history: Vec<Value>,
    transactions: HashMap<String, Value>,
    log: CallLog,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an older transaction carrying `text` as a memo
    pub fn with_memo(mut self, signature: &str, author: &str, text: &str, block_time: i64) -> Self {
        self.history.push(json!({
            "signature": signature,
            "slot": block_time,
            "err": null,
            "blockTime": block_time,
        }));
        self.transactions.insert(
            signature.to_string(),
            memo_transaction(author, &BASE64.encode(text), Some(block_time)),
        );
        self
    }

    /// Append an older transaction that failed on chain
    pub fn with_failed(mut self, signature: &str) -> Self {
        self.history.push(json!({
            "signature": signature,
            "err": {"InstructionError": [0, {"Custom": 1}]},
        }));
        self
    }

    /// Append an older transaction with no memo instruction
    pub fn with_plain(mut self, signature: &str) -> Self {
        self.history.push(json!({ "signature": signature, "err": null }));
        self.transactions.insert(
            signature.to_string(),
            json!({
                "blockTime": 1,
                "transaction": {"message": {
                    "accountKeys": [{"pubkey": "payer", "signer": true}],
                    "instructions": [
                        {"programId": "11111111111111111111111111111111", "data": "AAAA"},
                    ],
                }},
                "meta": {"innerInstructions": []},
            }),
        );
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn signatures_page(&self, params: &Value) -> Value {
        let options = &params[1];
        let limit = options["limit"].as_u64().unwrap_or(1000) as usize;
        let start = match options["before"].as_str() {
            Some(cursor) => self
                .history
                .iter()
                .position(|e| e["signature"] == cursor)
                .map(|i| i + 1)
                .unwrap_or(self.history.len()),
            None => 0,
        };
        Value::Array(self.history.iter().skip(start).take(limit).cloned().collect())
    }
}

#[async_trait]
impl RpcTransport for FakeLedger {
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<TransportResponse, String> {
        self.log.record(endpoint, body);
        let result = match body["method"].as_str() {
            Some("getSignaturesForAddress") => self.signatures_page(&body["params"]),
            Some("getTransaction") => body["params"][0]
                .as_str()
                .and_then(|sig| self.transactions.get(sig).cloned())
                .unwrap_or(Value::Null),
            _ => {
                return Ok(http(
                    200,
                    r#"{"jsonrpc":"2.0","id":1,"error":{"message":"unknown method"}}"#,
                ));
            }
        };
        Ok(http(
            200,
            &json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string(),
        ))
    }
}

/// `jsonParsed`-style transaction with one raw memo instruction
pub fn memo_transaction(author: &str, data_b64: &str, block_time: Option<i64>) -> Value {
    json!({
        "blockTime": block_time,
        "slot": 1,
        "transaction": {
            "message": {
                "accountKeys": [
                    {"pubkey": author, "signer": true, "writable": true},
                    {
                        "pubkey": "HQvMbrAMGjMkcobUV56MN9zaryPo9NarLddrEfc1wmLP",
                        "signer": false,
                        "writable": true,
                    },
                ],
                "instructions": [
                    {"programId": MEMO_V1, "data": data_b64, "stackHeight": null},
                ],
            },
            "signatures": ["sig"],
        },
        "meta": {"err": null, "innerInstructions": []},
    })
}
